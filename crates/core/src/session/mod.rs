//! Managed process sessions.
//!
//! A session supervises one long-running external command (a test runner,
//! a build) with replayable scrollback, throttled output notifications,
//! stop/cancel and process-tree termination.

pub mod buffer;
pub mod command;
pub mod error;
pub mod kill;
pub mod manager;
pub mod process;

pub use command::{build_command_line, sanitize_target};
pub use error::{SessionError, SessionResult};
pub use manager::{SessionConfig, SessionManager};
pub use process::ProcessSession;
