//! Error types for managed process sessions.

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("A session is already running for {scope} ({session_id})")]
    AlreadyRunning { scope: String, session_id: Uuid },

    #[error("Session {0} not found")]
    NotFound(Uuid),

    #[error("Command must not be empty")]
    EmptyCommand,

    #[error("Failed to spawn session {session_id}: {message}")]
    Spawn { session_id: Uuid, message: String },
}

pub type SessionResult<T> = Result<T, SessionError>;
