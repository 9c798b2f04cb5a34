//! Session state machine.
//!
//! This module provides the [`ProcessSession`] record and the functions that
//! move it through its lifecycle. All of them are synchronous; the manager
//! calls them while holding the session map lock and sends the returned
//! events after releasing it.

use crate::session::buffer::{PendingOutput, ScrollbackBuffer};
use chrono::{DateTime, Utc};
use fp_protocol::ipc::SessionEvent;
use fp_protocol::session_models::{BufferedOutput, SessionInfo, SessionStatus};
use std::process::ExitStatus;
use uuid::Uuid;

/// One supervised external process.
#[derive(Debug)]
pub struct ProcessSession {
    pub id: Uuid,
    pub scope: String,
    pub command: String,
    pub status: SessionStatus,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub pid: Option<u32>,
    pub scrollback: ScrollbackBuffer,
    pub pending: PendingOutput,
    /// Set once a stop was requested. No output is emitted afterwards.
    pub stopping: bool,
    /// Set once both output pipes reached end of stream.
    pub output_closed: bool,
}

impl ProcessSession {
    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id,
            scope: self.scope.clone(),
            command: self.command.clone(),
            status: self.status,
            exit_code: self.exit_code,
            error: self.error.clone(),
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }

    pub fn buffered_output(&self) -> BufferedOutput {
        BufferedOutput {
            scrollback: self.scrollback.as_str().to_string(),
            status: self.status,
        }
    }

    /// Pending or running sessions block their scope.
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }
}

/// Create a new session with Pending status.
pub fn create_session(scope: String, command: String, scrollback_limit: usize) -> ProcessSession {
    ProcessSession {
        id: Uuid::new_v4(),
        scope,
        command,
        status: SessionStatus::Pending,
        exit_code: None,
        error: None,
        started_at: Utc::now(),
        finished_at: None,
        pid: None,
        scrollback: ScrollbackBuffer::new(scrollback_limit),
        pending: PendingOutput::default(),
        stopping: false,
        output_closed: false,
    }
}

/// Transition to Running once the child is spawned.
pub fn mark_running(session: &mut ProcessSession, pid: Option<u32>) {
    if session.status == SessionStatus::Pending {
        session.status = SessionStatus::Running;
        session.pid = pid;
    }
}

/// Record a chunk of output.
///
/// Returns `false` (and records nothing) once the session is stopping or
/// terminal, so the caller knows not to arm the flusher.
pub fn append_output(session: &mut ProcessSession, chunk: &str) -> bool {
    if chunk.is_empty() || session.stopping || session.status.is_terminal() {
        return false;
    }
    session.scrollback.push(chunk);
    session.pending.push(chunk);
    true
}

/// Result of one flusher tick.
#[derive(Debug, PartialEq)]
pub struct FlushStep {
    pub event: Option<SessionEvent>,
    /// More output is pending after this batch.
    pub more: bool,
    /// Nothing more will ever be pending; the flusher may exit.
    pub done: bool,
}

/// Take the next batch of pending output as an event.
pub fn take_output_batch(session: &mut ProcessSession, max_bytes: usize) -> FlushStep {
    if session.stopping {
        session.pending.clear();
        return FlushStep {
            event: None,
            more: false,
            done: true,
        };
    }

    let event = session
        .pending
        .take_batch(max_bytes)
        .map(|content| SessionEvent::Output {
            session_id: session.id,
            scope: session.scope.clone(),
            content,
            timestamp: Utc::now(),
        });
    let more = !session.pending.is_empty();

    FlushStep {
        event,
        more,
        done: !more && (session.output_closed || session.status.is_terminal()),
    }
}

/// Move the session to a terminal status.
///
/// Returns the completion event on the first terminal transition only;
/// later calls leave the session untouched and return `None`.
pub fn finish_session(
    session: &mut ProcessSession,
    status: SessionStatus,
    exit_code: Option<i32>,
    error: Option<String>,
) -> Option<SessionEvent> {
    if session.status.is_terminal() || !status.is_terminal() {
        return None;
    }

    let now = Utc::now();
    session.status = status;
    session.exit_code = exit_code;
    session.error = error;
    session.finished_at = Some(now);

    let duration_ms = (now - session.started_at).num_milliseconds().max(0) as u64;

    Some(SessionEvent::Completed {
        session_id: session.id,
        scope: session.scope.clone(),
        command: session.command.clone(),
        status,
        exit_code,
        error: session.error.clone(),
        duration_ms,
        timestamp: now,
    })
}

/// Terminal outcome of a natural exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub status: SessionStatus,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
}

/// Map how the child ended to a terminal outcome.
///
/// A stop request wins over whatever the process reports.
pub fn outcome_for_exit(exit: &std::io::Result<ExitStatus>, stopping: bool) -> Outcome {
    if stopping {
        return Outcome {
            status: SessionStatus::Cancelled,
            exit_code: exit.as_ref().ok().and_then(|s| s.code()),
            error: None,
        };
    }

    match exit {
        Ok(status) => match status.code() {
            Some(0) => Outcome {
                status: SessionStatus::Passed,
                exit_code: Some(0),
                error: None,
            },
            Some(code) => Outcome {
                status: SessionStatus::Failed,
                exit_code: Some(code),
                error: None,
            },
            None => Outcome {
                status: SessionStatus::Failed,
                exit_code: None,
                error: Some("Process was terminated by a signal".to_string()),
            },
        },
        Err(e) => Outcome {
            status: SessionStatus::Error,
            exit_code: None,
            error: Some(format!("Failed waiting for process: {e}")),
        },
    }
}
