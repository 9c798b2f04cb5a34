//! Messages exchanged between the core and its callers.
//!
//! The protocol follows an Operation/Event pattern:
//! - `Op`: requests a caller sends to the session layer
//! - `SessionEvent`: push notifications the session layer emits
//!
//! Communication is asynchronous and channel-based. Both enums use tagged
//! serialization so a UI layer can consume them directly:
//! ```json
//! {
//!   "type": "output",
//!   "payload": {
//!     "session_id": "uuid-here",
//!     "scope": "/work/project",
//!     "content": "running 3 tests\n",
//!     "timestamp": "2025-01-01T00:00:00Z"
//!   }
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::session_models::{BufferedOutput, SessionStatus};

/// Requests sent to the session layer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Op {
    /// Start a supervised command under a scope.
    StartSession {
        scope: String,
        command: String,
        /// Optional sub-selector appended to the command (e.g. a test file).
        target_file: Option<String>,
    },

    /// Stop a running session and its whole process tree.
    StopSession {
        #[ts(type = "string")]
        session_id: Uuid,
    },

    /// Ask for the scrollback of a session (reconnect replay).
    GetBufferedOutput {
        #[ts(type = "string")]
        session_id: Uuid,
    },

    /// Stop every running session and release resources.
    Shutdown,
}

/// Replies to an [`Op`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum OpReply {
    Started {
        #[ts(type = "string")]
        session_id: Uuid,
    },
    Stopped,
    /// `None` when the session is unknown or already evicted.
    BufferedOutput(Option<BufferedOutput>),
    ShutdownComplete {
        stopped: usize,
    },
    Error {
        message: String,
    },
}

/// Push notifications emitted while sessions run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum SessionEvent {
    /// A throttled batch of process output.
    Output {
        #[ts(type = "string")]
        session_id: Uuid,
        scope: String,
        content: String,
        timestamp: DateTime<Utc>,
    },

    /// The session reached a terminal status. Emitted exactly once.
    Completed {
        #[ts(type = "string")]
        session_id: Uuid,
        scope: String,
        command: String,
        status: SessionStatus,
        exit_code: Option<i32>,
        error: Option<String>,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
}

impl SessionEvent {
    pub fn session_id(&self) -> Uuid {
        match self {
            Self::Output { session_id, .. } | Self::Completed { session_id, .. } => *session_id,
        }
    }
}
