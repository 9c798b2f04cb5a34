//! Runtime models for supervised process sessions.
//!
//! This module defines the structures for tracking the state of a long-running
//! external command (a test runner, a build, a dev server) that the core
//! supervises on behalf of a caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Lifecycle status of a supervised process session.
///
/// The status progresses through these states:
/// Pending -> Running -> one of {Passed, Failed, Cancelled, Error}
///
/// All four outcomes are terminal and absorbing.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Session has been created but the process is not spawned yet.
    Pending,

    /// Process is alive and producing output.
    Running,

    /// Process exited with code 0.
    Passed,

    /// Process exited with a non-zero code.
    Failed,

    /// Session was stopped by request.
    ///
    /// Wins over whatever exit code the process reports afterwards.
    Cancelled,

    /// Process could not be spawned or supervised.
    Error,
}

impl SessionStatus {
    /// Whether this status is one of the absorbing outcomes.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Passed | Self::Failed | Self::Cancelled | Self::Error
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a session, safe to hand to callers.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct SessionInfo {
    #[ts(type = "string")]
    pub id: Uuid,

    /// Logical key under which at most one session may run at a time,
    /// typically the working directory.
    pub scope: String,

    /// The full command line, including any sanitized target.
    pub command: String,

    pub status: SessionStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Replay payload for late subscribers.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct BufferedOutput {
    /// Bounded suffix of everything the process wrote.
    pub scrollback: String,
    pub status: SessionStatus,
}
