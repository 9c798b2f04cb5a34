//! End-to-end tests of the `fpilot` binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn fpilot() -> Command {
    Command::cargo_bin("fpilot").unwrap()
}

fn project_with_pipeline(yaml: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let fp_dir = dir.path().join(".feature-pilot");
    std::fs::create_dir_all(&fp_dir).unwrap();
    std::fs::write(fp_dir.join("pipeline.yaml"), yaml).unwrap();
    dir
}

#[test]
fn test_query_mock_prints_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    fpilot()
        .arg("--root")
        .arg(dir.path())
        .args(["query", "--model", "mock", "hello"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""type":"session_start""#))
        .stdout(predicate::str::contains("Mock response"))
        .stdout(predicate::str::contains(r#""type":"complete""#));
}

#[test]
fn test_query_error_event_fails() {
    let dir = tempfile::tempdir().unwrap();
    fpilot()
        .arg("--root")
        .arg(dir.path())
        .args(["query", "--model", "mock-failing", "hello"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Mock failure"));
}

#[test]
fn test_next_status_follows_configured_steps() {
    let dir = project_with_pipeline(
        "steps:\n  - {id: docs, name: Docs, order: 1}\n  - {id: review, name: Review, order: 0}\n",
    );

    fpilot()
        .arg("--root")
        .arg(dir.path())
        .args(["next-status", "--status", "in_progress"])
        .assert()
        .success()
        .stdout("pipeline_review\n");

    fpilot()
        .arg("--root")
        .arg(dir.path())
        .args(["next-status", "--status", "pipeline_review", "--exclude", "docs"])
        .assert()
        .success()
        .stdout("verified\n");

    fpilot()
        .arg("--root")
        .arg(dir.path())
        .args(["next-status", "--status", "pipeline_docs", "--skip-tests"])
        .assert()
        .success()
        .stdout("waiting_approval\n");
}

#[test]
fn test_next_status_without_config() {
    let dir = tempfile::tempdir().unwrap();
    fpilot()
        .arg("--root")
        .arg(dir.path())
        .args(["next-status", "--status", "in_progress"])
        .assert()
        .success()
        .stdout("verified\n");
}

#[test]
fn test_next_status_rejects_unknown_status() {
    let dir = tempfile::tempdir().unwrap();
    fpilot()
        .arg("--root")
        .arg(dir.path())
        .args(["next-status", "--status", "shipped"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown feature status"));
}

#[test]
fn test_invalid_config_is_reported() {
    let dir = project_with_pipeline("steps:\n  - {id: a, name: A, order: 0}\n  - {id: a, name: B, order: 1}\n");
    fpilot()
        .arg("--root")
        .arg(dir.path())
        .args(["next-status", "--status", "in_progress"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("pipeline.yaml"));
}

#[cfg(unix)]
#[test]
fn test_run_streams_output_and_passes() {
    let dir = tempfile::tempdir().unwrap();
    fpilot()
        .arg("--root")
        .arg(dir.path())
        .args(["run", "echo hi"])
        .assert()
        .success()
        .stdout("hi\n")
        .stderr(predicate::str::contains("passed"));
}

#[cfg(unix)]
#[test]
fn test_run_exits_with_command_code() {
    let dir = tempfile::tempdir().unwrap();
    fpilot()
        .arg("--root")
        .arg(dir.path())
        .args(["run", "exit 3"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("exit code 3"));
}

#[cfg(unix)]
#[test]
fn test_run_sanitizes_target() {
    let dir = tempfile::tempdir().unwrap();
    fpilot()
        .arg("--root")
        .arg(dir.path())
        .args(["run", "--target", "a.ts && touch pwned", "echo"])
        .assert()
        .success()
        .stdout("a.tstouchpwned\n");
    assert!(!dir.path().join("pwned").exists());
}
