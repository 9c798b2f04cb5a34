//! Session manager for supervising external processes.
//!
//! The SessionManager is the registry of all managed sessions. It starts
//! commands, streams their output as throttled [`SessionEvent::Output`]
//! batches, stops them with their whole process tree, and evicts finished
//! sessions once their retention window has passed.
//!
//! Each running session owns four tasks:
//! - two readers (stdout, stderr) appending to the session buffers
//! - one flusher, armed through a [`Notify`], emitting at most one batch per
//!   throttle interval
//! - one supervisor waiting for exit and emitting the completion event

use crate::session::buffer::Utf8Chunker;
use crate::session::command::{build_command_line, shell_command};
use crate::session::error::{SessionError, SessionResult};
use crate::session::kill::terminate_process_tree;
use crate::session::process::{
    append_output, create_session, finish_session, mark_running, outcome_for_exit,
    take_output_batch, Outcome, ProcessSession,
};
use chrono::Utc;
use fp_protocol::config_models::SessionSettings;
use fp_protocol::ipc::{Op, OpReply, SessionEvent};
use fp_protocol::session_models::{BufferedOutput, SessionInfo, SessionStatus};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;
use uuid::Uuid;

const READ_CHUNK_BYTES: usize = 4096;

/// How long readers may outlive the process before being abandoned.
///
/// Descendants that escaped the process group can keep a pipe open.
const READER_GRACE: Duration = Duration::from_secs(2);

const MIN_CLEANUP_INTERVAL: Duration = Duration::from_millis(10);

/// Runtime tuning of the session manager.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub scrollback_bytes: usize,
    pub throttle: Duration,
    pub batch_bytes: usize,
    pub retention: Duration,
    pub cleanup_interval: Duration,
    pub timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from(&SessionSettings::default())
    }
}

impl From<&SessionSettings> for SessionConfig {
    fn from(settings: &SessionSettings) -> Self {
        Self {
            scrollback_bytes: settings.scrollback_bytes,
            throttle: Duration::from_millis(settings.throttle_ms),
            batch_bytes: settings.batch_bytes.max(1),
            retention: Duration::from_secs(settings.retention_secs),
            cleanup_interval: Duration::from_secs(settings.cleanup_interval_secs),
            timeout: settings.timeout_secs.map(Duration::from_secs),
        }
    }
}

struct SessionEntry {
    session: ProcessSession,
    flush: Arc<Notify>,
}

type SessionMap = Arc<Mutex<HashMap<Uuid, SessionEntry>>>;

/// Manages all supervised process sessions.
///
/// At most one session may be active (pending or running) per scope. The
/// scope check and the insert happen under one lock acquisition.
pub struct SessionManager {
    /// Registry of all sessions, live and finished, indexed by id.
    sessions: SessionMap,

    config: SessionConfig,

    /// Channel for push notifications to the caller.
    events_tx: mpsc::Sender<SessionEvent>,

    cleanup_task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl SessionManager {
    pub fn new(config: SessionConfig, events_tx: mpsc::Sender<SessionEvent>) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            config,
            events_tx,
            cleanup_task: std::sync::Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Start `command` (plus the sanitized `target_file`) under `scope`.
    ///
    /// The scope is also the working directory of the process.
    ///
    /// # Errors
    ///
    /// - [`SessionError::AlreadyRunning`] if the scope has an active session
    /// - [`SessionError::EmptyCommand`] for a blank command
    /// - [`SessionError::Spawn`] if the process could not be started; the
    ///   session is still recorded with the `error` status and a completion
    ///   event is emitted
    pub async fn start(
        &self,
        scope: &str,
        command: &str,
        target_file: Option<&str>,
    ) -> SessionResult<Uuid> {
        let command_line = build_command_line(command, target_file)?;
        let flush = Arc::new(Notify::new());

        let mut sessions = self.sessions.lock().await;
        if let Some(active) = sessions
            .values()
            .find(|entry| entry.session.scope == scope && entry.session.is_active())
        {
            return Err(SessionError::AlreadyRunning {
                scope: scope.to_string(),
                session_id: active.session.id,
            });
        }

        let mut session = create_session(
            scope.to_string(),
            command_line.clone(),
            self.config.scrollback_bytes,
        );
        let id = session.id;

        let mut cmd = shell_command(&command_line);
        cmd.current_dir(scope);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                let message = e.to_string();
                tracing::error!(session_id = %id, scope, command = %command_line, error = %message, "failed to spawn session");
                let completed =
                    finish_session(&mut session, SessionStatus::Error, None, Some(message.clone()));
                sessions.insert(id, SessionEntry { session, flush });
                drop(sessions);

                if let Some(event) = completed {
                    self.emit(event).await;
                }
                return Err(SessionError::Spawn {
                    session_id: id,
                    message,
                });
            }
        };

        mark_running(&mut session, child.id());
        tracing::info!(session_id = %id, scope, command = %command_line, pid = child.id(), "session started");

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        sessions.insert(
            id,
            SessionEntry {
                session,
                flush: Arc::clone(&flush),
            },
        );
        drop(sessions);

        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = stdout {
            readers.push(tokio::spawn(read_output(
                stdout,
                Arc::clone(&self.sessions),
                id,
                Arc::clone(&flush),
            )));
        }
        if let Some(stderr) = stderr {
            readers.push(tokio::spawn(read_output(
                stderr,
                Arc::clone(&self.sessions),
                id,
                Arc::clone(&flush),
            )));
        }

        let flusher = tokio::spawn(run_flusher(
            Arc::clone(&self.sessions),
            id,
            Arc::clone(&flush),
            self.events_tx.clone(),
            self.config.throttle,
            self.config.batch_bytes,
        ));

        tokio::spawn(supervise(
            child,
            readers,
            flusher,
            Supervision {
                sessions: Arc::clone(&self.sessions),
                id,
                flush,
                events_tx: self.events_tx.clone(),
                timeout: self.config.timeout,
            },
        ));

        Ok(id)
    }

    /// Stop a session and its whole process tree.
    ///
    /// The `stopping` flag is set before the process is signalled, so no
    /// output is emitted afterwards and the outcome is `cancelled` whatever
    /// the exit code. Stopping a finished session is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] if the session is unknown.
    pub async fn stop(&self, id: Uuid) -> SessionResult<()> {
        let (pid, flush) = {
            let mut sessions = self.sessions.lock().await;
            let entry = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
            if entry.session.status.is_terminal() {
                return Ok(());
            }
            entry.session.stopping = true;
            entry.session.pending.clear();
            (entry.session.pid, Arc::clone(&entry.flush))
        };
        flush.notify_one();

        if let Some(pid) = pid {
            if let Err(e) = terminate_process_tree(pid).await {
                tracing::warn!(session_id = %id, pid, error = %e, "failed to terminate process tree");
            }
        }

        let completed = {
            let mut sessions = self.sessions.lock().await;
            sessions.get_mut(&id).and_then(|entry| {
                finish_session(&mut entry.session, SessionStatus::Cancelled, None, None)
            })
        };

        tracing::info!(session_id = %id, "session stopped");
        if let Some(event) = completed {
            self.emit(event).await;
        }
        Ok(())
    }

    /// Scrollback and status, for late subscribers.
    pub async fn buffered_output(&self, id: Uuid) -> Option<BufferedOutput> {
        let sessions = self.sessions.lock().await;
        sessions.get(&id).map(|entry| entry.session.buffered_output())
    }

    pub async fn session(&self, id: Uuid) -> Option<SessionInfo> {
        let sessions = self.sessions.lock().await;
        sessions.get(&id).map(|entry| entry.session.info())
    }

    /// All known sessions, oldest first.
    pub async fn list_sessions(&self) -> Vec<SessionInfo> {
        let sessions = self.sessions.lock().await;
        let mut infos: Vec<SessionInfo> = sessions.values().map(|e| e.session.info()).collect();
        infos.sort_by_key(|info| info.started_at);
        infos
    }

    /// The active session of `scope`, if any.
    pub async fn running_session_for(&self, scope: &str) -> Option<SessionInfo> {
        let sessions = self.sessions.lock().await;
        sessions
            .values()
            .find(|e| e.session.scope == scope && e.session.is_active())
            .map(|e| e.session.info())
    }

    /// Evict finished sessions older than the retention window.
    ///
    /// Returns the number of evicted sessions.
    pub async fn cleanup_expired(&self) -> usize {
        evict_expired(&self.sessions, self.config.retention).await
    }

    /// Run [`cleanup_expired`](Self::cleanup_expired) on the configured
    /// interval until [`shutdown`](Self::shutdown). Restarts the task if it
    /// is already running.
    pub fn start_cleanup_task(&self) {
        let sessions = Arc::clone(&self.sessions);
        let retention = self.config.retention;
        let period = self.config.cleanup_interval.max(MIN_CLEANUP_INTERVAL);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = evict_expired(&sessions, retention).await;
                if evicted > 0 {
                    tracing::debug!(evicted, "evicted expired sessions");
                }
            }
        });

        if let Some(old) = self.cleanup_handle().replace(handle) {
            old.abort();
        }
    }

    /// Stop the cleanup task and force-stop every active session.
    ///
    /// Returns the number of sessions stopped.
    pub async fn shutdown(&self) -> usize {
        if let Some(handle) = self.cleanup_handle().take() {
            handle.abort();
        }

        let active: Vec<Uuid> = {
            let sessions = self.sessions.lock().await;
            sessions
                .values()
                .filter(|e| e.session.is_active())
                .map(|e| e.session.id)
                .collect()
        };

        let mut stopped = 0;
        for id in active {
            if self.stop(id).await.is_ok() {
                stopped += 1;
            }
        }
        tracing::info!(stopped, "session manager shut down");
        stopped
    }

    /// Dispatch one request.
    pub async fn handle(&self, op: Op) -> OpReply {
        match op {
            Op::StartSession {
                scope,
                command,
                target_file,
            } => match self.start(&scope, &command, target_file.as_deref()).await {
                Ok(session_id) => OpReply::Started { session_id },
                Err(e) => OpReply::Error {
                    message: e.to_string(),
                },
            },
            Op::StopSession { session_id } => match self.stop(session_id).await {
                Ok(()) => OpReply::Stopped,
                Err(e) => OpReply::Error {
                    message: e.to_string(),
                },
            },
            Op::GetBufferedOutput { session_id } => {
                OpReply::BufferedOutput(self.buffered_output(session_id).await)
            }
            Op::Shutdown => OpReply::ShutdownComplete {
                stopped: self.shutdown().await,
            },
        }
    }

    async fn emit(&self, event: SessionEvent) {
        if self.events_tx.send(event).await.is_err() {
            tracing::debug!("session event receiver dropped");
        }
    }

    fn cleanup_handle(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.cleanup_task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if let Some(handle) = self.cleanup_handle().take() {
            handle.abort();
        }
    }
}

async fn evict_expired(sessions: &SessionMap, retention: Duration) -> usize {
    let now = Utc::now();
    let mut sessions = sessions.lock().await;
    let before = sessions.len();
    sessions.retain(|_, entry| {
        let expired = entry.session.status.is_terminal()
            && entry
                .session
                .finished_at
                .and_then(|finished| (now - finished).to_std().ok())
                .is_some_and(|age| age >= retention);
        !expired
    });
    before - sessions.len()
}

async fn read_output<R>(mut reader: R, sessions: SessionMap, id: Uuid, flush: Arc<Notify>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut chunker = Utf8Chunker::default();
    let mut buf = vec![0u8; READ_CHUNK_BYTES];

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                tracing::debug!(session_id = %id, error = %e, "output pipe read failed");
                break;
            }
        };
        // Keep draining after a stop so the child never blocks on a full pipe.
        let text = chunker.push(&buf[..n]);
        if record_output(&sessions, id, &text).await {
            flush.notify_one();
        }
    }

    let rest = chunker.finish();
    if record_output(&sessions, id, &rest).await {
        flush.notify_one();
    }
}

async fn record_output(sessions: &SessionMap, id: Uuid, text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    let mut sessions = sessions.lock().await;
    sessions
        .get_mut(&id)
        .is_some_and(|entry| append_output(&mut entry.session, text))
}

async fn run_flusher(
    sessions: SessionMap,
    id: Uuid,
    flush: Arc<Notify>,
    events_tx: mpsc::Sender<SessionEvent>,
    throttle: Duration,
    batch_bytes: usize,
) {
    loop {
        flush.notified().await;
        loop {
            tokio::time::sleep(throttle).await;

            let step = {
                let mut sessions = sessions.lock().await;
                match sessions.get_mut(&id) {
                    Some(entry) => take_output_batch(&mut entry.session, batch_bytes),
                    None => return,
                }
            };

            if let Some(event) = step.event {
                if events_tx.send(event).await.is_err() {
                    tracing::debug!(session_id = %id, "session event receiver dropped");
                }
            }
            if step.done {
                return;
            }
            if !step.more {
                break;
            }
        }
    }
}

struct Supervision {
    sessions: SessionMap,
    id: Uuid,
    flush: Arc<Notify>,
    events_tx: mpsc::Sender<SessionEvent>,
    timeout: Option<Duration>,
}

async fn supervise(
    mut child: Child,
    readers: Vec<JoinHandle<()>>,
    flusher: JoinHandle<()>,
    ctx: Supervision,
) {
    let Supervision {
        sessions,
        id,
        flush,
        events_tx,
        timeout,
    } = ctx;

    let mut timed_out = None;
    let exit = match timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(exit) => exit,
            Err(_) => {
                tracing::warn!(session_id = %id, limit_secs = limit.as_secs(), "session timed out");
                timed_out = Some(limit);
                {
                    let mut sessions = sessions.lock().await;
                    if let Some(entry) = sessions.get_mut(&id) {
                        entry.session.stopping = true;
                        entry.session.pending.clear();
                    }
                }
                if let Some(pid) = child.id() {
                    if let Err(e) = terminate_process_tree(pid).await {
                        tracing::warn!(session_id = %id, pid, error = %e, "failed to terminate process tree");
                    }
                }
                child.wait().await
            }
        },
        None => child.wait().await,
    };

    for reader in readers {
        let abort = reader.abort_handle();
        if tokio::time::timeout(READER_GRACE, reader).await.is_err() {
            tracing::debug!(session_id = %id, "abandoning output reader held open by a descendant");
            abort.abort();
        }
    }

    {
        let mut sessions = sessions.lock().await;
        if let Some(entry) = sessions.get_mut(&id) {
            entry.session.output_closed = true;
        }
    }
    flush.notify_one();
    let _ = flusher.await;

    let completed = {
        let mut sessions = sessions.lock().await;
        let Some(entry) = sessions.get_mut(&id) else {
            return;
        };
        let outcome = match timed_out {
            Some(limit) => Outcome {
                status: SessionStatus::Error,
                exit_code: exit.as_ref().ok().and_then(|s| s.code()),
                error: Some(format!("Timed out after {}s", limit.as_secs())),
            },
            None => outcome_for_exit(&exit, entry.session.stopping),
        };
        finish_session(
            &mut entry.session,
            outcome.status,
            outcome.exit_code,
            outcome.error,
        )
    };

    if let Some(event) = completed {
        if let SessionEvent::Completed {
            status,
            exit_code,
            duration_ms,
            ..
        } = &event
        {
            tracing::info!(session_id = %id, %status, exit_code = ?exit_code, duration_ms, "session finished");
        }
        if events_tx.send(event).await.is_err() {
            tracing::debug!(session_id = %id, "session event receiver dropped");
        }
    }
}
