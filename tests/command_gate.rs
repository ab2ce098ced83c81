// tests/command_gate.rs
#![cfg(unix)]

use std::time::{Duration, Instant};

use forge::gate::{CommandGate, Gate, GatePipeline, GateRegistry, PipelineOptions};
use forge_test_utils::init_tracing;
use tempfile::tempdir;

#[tokio::test]
async fn test_successful_command_passes() {
    let dir = tempdir().unwrap();
    let gate = CommandGate::new("ok", "true");

    let result = gate.run(dir.path()).await.unwrap();
    assert!(result.passed);
    assert!(result.errors.is_empty());
}

#[tokio::test]
async fn test_command_runs_in_project_dir() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("marker.txt"), "x").unwrap();

    let gate = CommandGate::new("cwd", "test -f marker.txt");
    assert!(gate.run(dir.path()).await.unwrap().passed);
}

#[tokio::test]
async fn test_failure_output_becomes_diagnostics() {
    init_tracing();

    let dir = tempdir().unwrap();
    let gate = CommandGate::new(
        "types",
        "echo 'src/main.rs:12:5: expected `;`' >&2; echo 'aborting due to previous error' >&2; exit 2",
    )
    .with_remediation("run the type checker locally");

    let result = gate.run(dir.path()).await.unwrap();
    assert!(!result.passed);
    assert_eq!(result.errors.len(), 3);

    let first = &result.errors[0];
    assert_eq!(first.file.as_deref(), Some("src/main.rs"));
    assert_eq!(first.line, Some(12));
    assert_eq!(first.message, "expected `;`");
    assert_eq!(first.remediation.as_deref(), Some("run the type checker locally"));

    assert_eq!(result.errors[1].file, None);
    assert_eq!(result.errors[1].message, "aborting due to previous error");
    assert!(result.errors[2].message.ends_with("exited with code 2"));
}

#[tokio::test]
async fn test_stdout_used_when_stderr_empty() {
    let dir = tempdir().unwrap();
    let gate = CommandGate::new("tests", "echo '3 tests failed'; exit 1");

    let result = gate.run(dir.path()).await.unwrap();
    assert_eq!(result.errors[0].message, "3 tests failed");
}

#[tokio::test]
async fn test_only_output_tail_is_kept() {
    let dir = tempdir().unwrap();
    let gate = CommandGate::new("noisy", "for i in $(seq 1 50); do echo line $i >&2; done; exit 1");

    let result = gate.run(dir.path()).await.unwrap();
    // 20 output lines plus the exit-code line.
    assert_eq!(result.errors.len(), 21);
    assert_eq!(result.errors[0].message, "line 31");
    assert_eq!(result.errors[19].message, "line 50");
}

#[tokio::test]
async fn test_timeout_kills_the_subprocess() {
    init_tracing();

    let dir = tempdir().unwrap();
    let registry = GateRegistry::new().with(CommandGate::new(
        "slow",
        "sleep 1 && touch finished.marker",
    ));
    let options = PipelineOptions::default().with_timeout("slow", Duration::from_millis(200));

    let started = Instant::now();
    let result = GatePipeline::new(registry, dir.path())
        .run(&["slow"], &options)
        .await;
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(!result.passed);
    assert!(result.gates[0].errors[0].message.contains("timed out"));

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(
        !dir.path().join("finished.marker").exists(),
        "timed-out command kept running"
    );
}

#[tokio::test]
async fn test_timeout_kills_background_jobs_of_the_command() {
    init_tracing();

    let dir = tempdir().unwrap();
    let registry = GateRegistry::new().with(CommandGate::new(
        "spawner",
        "(sleep 1; touch orphan.marker) & wait",
    ));
    let options = PipelineOptions::default().with_timeout("spawner", Duration::from_millis(200));

    let result = GatePipeline::new(registry, dir.path())
        .run(&["spawner"], &options)
        .await;
    assert!(!result.passed);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(
        !dir.path().join("orphan.marker").exists(),
        "background job outlived the timed-out gate"
    );
}

#[tokio::test]
async fn test_background_job_finishing_in_time_is_left_alone() {
    let dir = tempdir().unwrap();
    let gate = CommandGate::new("bg", "(touch done.marker) & wait");

    assert!(gate.run(dir.path()).await.unwrap().passed);
    assert!(dir.path().join("done.marker").exists());
}
