//! Subcommand implementations.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use colored::Colorize;
use fp_core::agents::{ProviderContext, ProviderKind, ProviderRegistry, QueryOptions};
use fp_core::config::AppConfig;
use fp_core::session::SessionManager;
use fp_protocol::ipc::SessionEvent;
use fp_protocol::pipeline_models::FeatureStatus;
use fp_protocol::session_models::SessionStatus;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;

/// Exit code of a session stopped by Ctrl-C.
const INTERRUPTED: u8 = 130;

fn registry(config: &AppConfig) -> ProviderRegistry {
    ProviderRegistry::new(ProviderContext {
        liveness: config.liveness(),
        ..ProviderContext::default()
    })
}

pub async fn query(
    config: &AppConfig,
    model: &str,
    system: Option<String>,
    cwd: PathBuf,
    prompt: &str,
) -> Result<ExitCode> {
    let mut options = QueryOptions::new(prompt, model).with_working_dir(cwd);
    if let Some(system) = system {
        options = options.with_system_prompt(system);
    }

    let mut stream = registry(config).execute_query(options);
    let mut failed = false;
    while let Some(event) = stream.next().await {
        failed |= event.is_error();
        writeln!(std::io::stdout(), "{}", serde_json::to_string(&event)?)?;
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

pub async fn run(
    config: &AppConfig,
    scope: &Path,
    command: &str,
    target: Option<&str>,
) -> Result<ExitCode> {
    let (tx, mut rx) = mpsc::channel(256);
    let manager = SessionManager::new(config.session_config(), tx);
    let id = manager
        .start(&scope.display().to_string(), command, target)
        .await?;

    let mut interrupted = false;
    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(SessionEvent::Output { content, .. }) => {
                    let mut stdout = std::io::stdout().lock();
                    stdout.write_all(content.as_bytes())?;
                    stdout.flush()?;
                }
                Some(SessionEvent::Completed { session_id, status, exit_code, error, duration_ms, .. })
                    if session_id == id =>
                {
                    report(status, exit_code, error.as_deref(), duration_ms);
                    return Ok(exit_code_for(status, exit_code));
                }
                Some(_) => {}
                None => return Err(eyre!("session event channel closed")),
            },
            signal = tokio::signal::ctrl_c(), if !interrupted => {
                signal?;
                interrupted = true;
                tracing::info!(session_id = %id, "interrupted, stopping session");
                manager.stop(id).await?;
            }
        }
    }
}

fn report(status: SessionStatus, exit_code: Option<i32>, error: Option<&str>, duration_ms: u64) {
    let elapsed = format!("{:.1}s", Duration::from_millis(duration_ms).as_secs_f64());
    let line = match status {
        SessionStatus::Passed => format!("✓ passed in {elapsed}").green(),
        SessionStatus::Failed => match exit_code {
            Some(code) => format!("✗ failed with exit code {code} after {elapsed}").red(),
            None => format!("✗ failed after {elapsed}").red(),
        },
        SessionStatus::Cancelled => format!("■ cancelled after {elapsed}").yellow(),
        other => format!("✗ {other}: {}", error.unwrap_or("unknown error")).red(),
    };
    eprintln!("{}", line.bold());
}

fn exit_code_for(status: SessionStatus, exit_code: Option<i32>) -> ExitCode {
    match status {
        SessionStatus::Passed => ExitCode::SUCCESS,
        SessionStatus::Failed => exit_code
            .and_then(|code| u8::try_from(code).ok())
            .filter(|code| *code != 0)
            .map_or(ExitCode::FAILURE, ExitCode::from),
        SessionStatus::Cancelled => ExitCode::from(INTERRUPTED),
        _ => ExitCode::FAILURE,
    }
}

pub fn next_status(
    config: &AppConfig,
    status: &str,
    excluded: &[String],
    skip_tests: bool,
) -> Result<ExitCode> {
    let current: FeatureStatus = status.parse()?;
    let next = fp_core::pipeline::next_status(
        &current,
        &config.pipeline.steps,
        excluded,
        skip_tests || config.skip_tests(),
    );
    println!("{next}");
    Ok(ExitCode::SUCCESS)
}

pub async fn providers(config: &AppConfig) -> Result<ExitCode> {
    let available = registry(config).available_providers().await;
    for kind in [ProviderKind::Claude, ProviderKind::Codex, ProviderKind::Mock] {
        if available.contains(&kind) {
            println!("{} {}", "●".green(), kind.name());
        } else {
            println!("{} {} {}", "○".dimmed(), kind.name(), "(not installed)".dimmed());
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_for_outcomes() {
        assert_eq!(exit_code_for(SessionStatus::Passed, Some(0)), ExitCode::SUCCESS);
        assert_eq!(exit_code_for(SessionStatus::Failed, Some(3)), ExitCode::from(3));
        assert_eq!(exit_code_for(SessionStatus::Failed, Some(-1)), ExitCode::FAILURE);
        assert_eq!(exit_code_for(SessionStatus::Failed, None), ExitCode::FAILURE);
        assert_eq!(
            exit_code_for(SessionStatus::Cancelled, None),
            ExitCode::from(INTERRUPTED)
        );
        assert_eq!(exit_code_for(SessionStatus::Error, None), ExitCode::FAILURE);
    }
}
