//! End-to-end runs through the shell-backed runner.

use benchgate_pipeline::{
    CommandRunner, ExecutorConfig, FailureKind, JobStatus, LocalCache, PipelineStatus,
    PlatformPolicy, SkipReason, StepStatus, TriggerEvent, Workflow, run_workflow,
};
use std::path::Path;

const GATED: &str = r#"
name = "Gated"

[triggers]
push = ["main"]
pull_request = true

[env]
GATE_TOKEN = "ok"

[[jobs]]
id = "check"
name = "Check"
runs_on = "ubuntu-latest"

[[jobs.steps]]
name = "Check formatting"
run = "FORMAT"
kind = "format"

[[jobs.steps]]
name = "Clippy"
run = "touch clippy-ran"
kind = "lint"

[[jobs]]
id = "bench"
name = "Bench"
needs = ["check"]
fail_fast = false
runs_on = { matrix = ["ubuntu-latest", "macos-latest"] }

[[jobs.steps]]
name = "Run benchmarks"
run = "test \"$GATE_TOKEN\" = ok && touch bench-ran"
kind = "bench"
"#;

fn workflow(format_command: &str) -> Workflow {
    Workflow::from_toml_str(&GATED.replace("FORMAT", format_command)).unwrap()
}

fn config(dir: &Path) -> ExecutorConfig {
    let mut config = ExecutorConfig::new(dir);
    config.policy = PlatformPolicy::Emulate;
    config
}

fn runner(dir: &Path) -> CommandRunner {
    CommandRunner::new(LocalCache::new(dir.join(".cache")))
}

#[cfg(unix)]
#[test]
fn format_violation_gates_everything_after_it() {
    let dir = tempfile::tempdir().unwrap();
    let run = run_workflow(
        &workflow("exit 1"),
        &TriggerEvent::PullRequest,
        runner(dir.path()),
        config(dir.path()),
    )
    .unwrap();

    assert_eq!(run.status, PipelineStatus::Failed);
    assert_eq!(run.status.exit_code(), 1);

    let check = run.job("check")[0];
    assert_eq!(
        check.status,
        JobStatus::Failed {
            step: "Check formatting".into(),
            kind: FailureKind::Format,
        }
    );
    assert_eq!(check.steps[1].status, StepStatus::NotRun);
    assert!(!dir.path().join("clippy-ran").exists());

    for bench in run.job("bench") {
        assert_eq!(
            bench.status,
            JobStatus::Skipped {
                reason: SkipReason::DependencyNotMet { job: "check".into() }
            }
        );
    }
    assert!(!dir.path().join("bench-ran").exists());
}

#[cfg(unix)]
#[test]
fn clean_tree_runs_bench_on_every_platform() {
    let dir = tempfile::tempdir().unwrap();
    let run = run_workflow(
        &workflow("true"),
        &TriggerEvent::push("main"),
        runner(dir.path()),
        config(dir.path()),
    )
    .unwrap();

    assert_eq!(run.status, PipelineStatus::Success);
    assert_eq!(run.jobs.len(), 3);
    assert!(run.jobs.iter().all(|j| j.status.is_success()));
    assert!(dir.path().join("clippy-ran").exists());
    assert!(dir.path().join("bench-ran").exists());
    assert!(run.finished_at >= run.started_at);
}

#[test]
fn untracked_branch_is_not_triggered() {
    let dir = tempfile::tempdir().unwrap();
    let run = run_workflow(
        &workflow("true"),
        &TriggerEvent::push("refs/heads/feature"),
        runner(dir.path()),
        config(dir.path()),
    )
    .unwrap();
    assert_eq!(run.status, PipelineStatus::NotTriggered);
    assert_eq!(run.status.exit_code(), 0);
    assert!(run.jobs.is_empty());
}

#[test]
fn run_serializes_for_reports() {
    let dir = tempfile::tempdir().unwrap();
    let run = run_workflow(
        &workflow("true"),
        &TriggerEvent::push("topic"),
        runner(dir.path()),
        config(dir.path()),
    )
    .unwrap();
    let json = serde_json::to_value(&run).unwrap();
    assert_eq!(json["status"], "not_triggered");
    assert_eq!(json["event"]["event"], "push");
}
