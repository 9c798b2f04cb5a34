//! Test fixtures: fake CLIs, executors, pipeline steps.

use fp_core::agents::adapters::codex_adapter::CODEX_BACKEND;
use fp_core::agents::{AgentProcessExecutor, CliInvocation, FixedResolver, StaticCredentials};
use fp_core::session::{SessionConfig, SessionManager};
use fp_protocol::ipc::SessionEvent;
use fp_protocol::pipeline_models::PipelineStep;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Write a shell script into `dir`. It is run through `/bin/sh`, so it does
/// not need to be executable.
#[allow(dead_code)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("Failed to write script");
    path
}

/// Write a script and mark it executable, for tests that exec it directly.
#[allow(dead_code)]
#[cfg(unix)]
pub fn write_executable(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = write_script(dir, name, body);
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("Failed to chmod script");
    path
}

/// A Codex executor whose "CLI" is `/bin/sh`; pass the script as first arg.
#[allow(dead_code)]
pub fn sh_executor(credentials: StaticCredentials) -> AgentProcessExecutor {
    AgentProcessExecutor::new(
        CODEX_BACKEND,
        Arc::new(FixedResolver::new("/bin/sh")),
        Arc::new(credentials),
    )
}

/// Invocation running `script` in `dir`.
#[allow(dead_code)]
pub fn script_invocation(script: &Path, dir: &Path) -> CliInvocation {
    CliInvocation {
        args: vec![script.display().to_string()],
        working_dir: dir.to_path_buf(),
        env: HashMap::new(),
    }
}

/// Session manager with a fast throttle for tests.
#[allow(dead_code)]
pub fn test_manager(config: SessionConfig) -> (SessionManager, mpsc::Receiver<SessionEvent>) {
    let (tx, rx) = mpsc::channel(256);
    (SessionManager::new(config, tx), rx)
}

#[allow(dead_code)]
pub fn fast_session_config() -> SessionConfig {
    SessionConfig {
        throttle: Duration::from_millis(20),
        ..SessionConfig::default()
    }
}

/// Create a pipeline step with the given id and order.
#[allow(dead_code)]
pub fn step(id: &str, order: u32) -> PipelineStep {
    PipelineStep {
        id: id.to_string(),
        name: format!("Step {id}"),
        order,
        color: "blue".to_string(),
        instructions: String::new(),
        created_at: None,
        updated_at: None,
    }
}
