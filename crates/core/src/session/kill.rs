//! Cross-platform process-tree termination.

use std::time::Duration;

/// Time between the polite and the forced signal on unix.
pub const KILL_GRACE: Duration = Duration::from_secs(2);

/// Terminate the process `pid` and all of its descendants.
///
/// Unix: the session child leads its own process group, so the group gets
/// `SIGTERM`, then `SIGKILL` after [`KILL_GRACE`] if it is still alive.
/// Windows: `taskkill /T /F` on the tree.
///
/// A process that is already gone is not an error.
#[cfg(unix)]
pub async fn terminate_process_tree(pid: u32) -> std::io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let pgid = Pid::from_raw(pid as i32);
    match killpg(pgid, Signal::SIGTERM) {
        Ok(()) => {}
        Err(Errno::ESRCH) => return Ok(()),
        Err(e) => return Err(std::io::Error::from(e)),
    }
    tracing::debug!(pid, "sent SIGTERM to process group");

    tokio::spawn(async move {
        tokio::time::sleep(KILL_GRACE).await;
        if killpg(pgid, None).is_ok() {
            tracing::warn!(pid, "process group survived SIGTERM, sending SIGKILL");
            let _ = killpg(pgid, Signal::SIGKILL);
        }
    });

    Ok(())
}

#[cfg(windows)]
pub async fn terminate_process_tree(pid: u32) -> std::io::Result<()> {
    let status = tokio::process::Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/T", "/F"])
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .await?;

    if !status.success() {
        // 128: no such process.
        tracing::debug!(pid, code = status.code(), "taskkill did not succeed");
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::session::command::shell_command;

    #[tokio::test]
    async fn test_terminate_process_tree_kills_group() {
        let mut child = shell_command("sleep 30 & sleep 30; wait").spawn().unwrap();
        let pid = child.id().unwrap();

        terminate_process_tree(pid).await.unwrap();

        let status = tokio::time::timeout(Duration::from_secs(5), child.wait())
            .await
            .expect("child should exit after termination")
            .unwrap();
        assert!(!status.success());
    }

    #[tokio::test]
    async fn test_terminate_missing_process_is_ok() {
        let mut child = shell_command("exit 0").spawn().unwrap();
        let pid = child.id().unwrap();
        child.wait().await.unwrap();

        assert!(terminate_process_tree(pid).await.is_ok());
    }
}
