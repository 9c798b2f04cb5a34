//! Command-line construction for managed sessions.

use crate::session::error::{SessionError, SessionResult};
use tokio::process::Command;

/// Keep only `[A-Za-z0-9_./@-]` from a caller-supplied sub-selector.
pub fn sanitize_target(target: &str) -> String {
    target
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '/' | '@' | '-'))
        .collect()
}

/// Join a base command and an optional target into one command line.
///
/// The target is sanitized first; a target that sanitizes to nothing is
/// ignored.
pub fn build_command_line(command: &str, target_file: Option<&str>) -> SessionResult<String> {
    let command = command.trim();
    if command.is_empty() {
        return Err(SessionError::EmptyCommand);
    }

    match target_file.map(sanitize_target).filter(|t| !t.is_empty()) {
        Some(target) => Ok(format!("{command} {target}")),
        None => Ok(command.to_string()),
    }
}

/// A shell invocation of `line`.
///
/// On unix the child leads its own process group so the whole tree can be
/// signalled at once.
pub fn shell_command(line: &str) -> Command {
    #[cfg(unix)]
    {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(line);
        cmd.process_group(0);
        cmd
    }

    #[cfg(windows)]
    {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(line);
        cmd
    }
}
