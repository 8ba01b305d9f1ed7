//! Integration tests for benchgate
//!
//! These run the standard workflow end to end with a scripted step runner,
//! check the rendered Actions file against the checked-in copy, and drive a
//! registered benchmark group through the statistics pipeline.

use benchgate::pipeline::{
    ExecutorConfig, FailureKind, JobStatus, PipelineExecutor, PipelineRun, PipelineStatus,
    PlatformPolicy, SkipReason, StepAction, StepContext, StepDef, StepKind, StepRunner,
    StepStatus, TriggerEvent, Workflow, job_graph, plan,
};
use benchgate::prelude::*;
use benchgate::{BootstrapConfig, compute_bootstrap, compute_summary, registered_groups};
use std::collections::HashSet;
use std::sync::Mutex;

/// Fails every `run` step of the given kinds and records what ran.
#[derive(Default)]
struct Scripted {
    failing: Vec<StepKind>,
    ran: Mutex<Vec<String>>,
}

impl Scripted {
    fn failing(kinds: &[StepKind]) -> Self {
        Self {
            failing: kinds.to_vec(),
            ..Default::default()
        }
    }

    fn ran(&self) -> Vec<String> {
        self.ran.lock().unwrap().clone()
    }
}

impl StepRunner for Scripted {
    fn run_step(&self, ctx: &StepContext<'_>, step: &StepDef) -> StepStatus {
        self.ran
            .lock()
            .unwrap()
            .push(format!("{}:{}", ctx.instance.name, step.name));
        match &step.action {
            StepAction::Run { kind, .. } if self.failing.contains(kind) => {
                StepStatus::failed(FailureKind::from(*kind), Some(1), "scripted failure")
            }
            _ => StepStatus::Success,
        }
    }
}

fn run_standard(event: &TriggerEvent, runner: &Scripted) -> PipelineRun {
    let workflow = Workflow::standard();
    let Some(plan) = plan(&workflow, event).unwrap() else {
        return PipelineRun::not_triggered(workflow.name, event.clone());
    };
    let mut config = ExecutorConfig::new(".");
    config.policy = PlatformPolicy::Emulate;
    PipelineExecutor::new(runner, config).run(&plan).unwrap()
}

#[test]
fn rendered_workflow_matches_checked_in_file() {
    let checked_in = include_str!("../../.github/workflows/ci.yml");
    assert_eq!(
        benchgate::render_github_workflow(&Workflow::standard()),
        checked_in,
        "run `benchgate render --output .github/workflows/ci.yml`"
    );
}

#[test]
fn check_is_scheduled_once_per_triggering_event() {
    let workflow = Workflow::standard();
    for event in [TriggerEvent::push("main"), TriggerEvent::PullRequest] {
        let plan = plan(&workflow, &event).unwrap().unwrap();
        assert_eq!(plan.instances_of("check").count(), 1);
        assert_eq!(plan.stage_of("check"), Some(0));
        assert_eq!(plan.stage_of("bench"), Some(1));
    }
    assert!(plan(&workflow, &TriggerEvent::push("feature/x")).unwrap().is_none());
}

#[test]
fn bench_fans_out_over_distinct_platforms() {
    let plan = plan(&Workflow::standard(), &TriggerEvent::PullRequest)
        .unwrap()
        .unwrap();
    let platforms: HashSet<String> = plan
        .instances_of("bench")
        .map(|i| i.platform.to_string())
        .collect();
    assert_eq!(plan.instances_of("bench").count(), 4);
    assert_eq!(platforms.len(), 4);
    assert!(platforms.contains("ubuntu-24.04-arm"));
}

#[test]
fn job_graph_edges_are_exactly_bench_to_check() {
    let graph = job_graph(&Workflow::standard());
    assert_eq!(graph.edges(), vec![("bench", "check")]);

    let mut renamed = Workflow::standard();
    renamed.jobs[1].needs = vec!["lint".into()];
    assert!(plan(&renamed, &TriggerEvent::PullRequest).is_err());

    let mut dropped = Workflow::standard();
    dropped.jobs[1].needs.clear();
    assert!(job_graph(&dropped).edges().is_empty());
}

#[test]
fn clean_tree_runs_check_then_every_bench() {
    let runner = Scripted::default();
    let run = run_standard(&TriggerEvent::push("main"), &runner);

    assert_eq!(run.status, PipelineStatus::Success);
    assert_eq!(run.status.exit_code(), 0);
    assert_eq!(run.job("bench").len(), 4);
    assert!(run.job("bench").iter().all(|j| j.status.is_success()));

    // Check's last step precedes every bench step
    let ran = runner.ran();
    let last_check = ran.iter().rposition(|s| s.starts_with("Check:")).unwrap();
    let first_bench = ran.iter().position(|s| s.starts_with("Bench (")).unwrap();
    assert!(last_check < first_bench);
}

#[test]
fn format_violation_skips_the_bench_stage() {
    let runner = Scripted::failing(&[StepKind::Format]);
    let run = run_standard(&TriggerEvent::PullRequest, &runner);

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
    let after: Vec<&StepStatus> = check
        .steps
        .iter()
        .skip_while(|s| s.name != "Check formatting")
        .skip(1)
        .map(|s| &s.status)
        .collect();
    assert_eq!(after, vec![&StepStatus::NotRun, &StepStatus::NotRun]);

    let bench = run.job("bench");
    assert_eq!(bench.len(), 4);
    for instance in bench {
        assert_eq!(
            instance.status,
            JobStatus::Skipped {
                reason: SkipReason::DependencyNotMet {
                    job: "check".into()
                }
            }
        );
        assert!(instance.steps.is_empty());
    }
    assert!(!runner.ran().iter().any(|s| s.starts_with("Bench (")));
}

#[test]
fn bench_failures_are_reported_per_platform() {
    let runner = Scripted::failing(&[StepKind::Bench]);
    let run = run_standard(&TriggerEvent::PullRequest, &runner);

    assert_eq!(run.status, PipelineStatus::Failed);
    assert!(run.job("check")[0].status.is_success());
    // fail-fast is off for the matrix, so every platform reports its own failure
    for instance in run.job("bench") {
        assert!(matches!(
            instance.status,
            JobStatus::Failed {
                kind: FailureKind::Benchmark,
                ..
            }
        ));
    }
    let (_, kind) = run.first_failure().unwrap();
    assert_eq!(kind, FailureKind::Benchmark);
}

#[test]
fn untracked_branch_runs_nothing() {
    let runner = Scripted::default();
    let run = run_standard(&TriggerEvent::push("refs/heads/topic"), &runner);
    assert_eq!(run.status, PipelineStatus::NotTriggered);
    assert_eq!(run.status.exit_code(), 0);
    assert!(run.jobs.is_empty());
    assert!(runner.ran().is_empty());
}

#[test]
fn run_report_is_json() {
    let run = run_standard(&TriggerEvent::PullRequest, &Scripted::failing(&[StepKind::Lint]));
    let json = serde_json::to_value(&run).unwrap();
    assert_eq!(json["status"], "failed");
    assert_eq!(json["jobs"][0]["status"]["status"], "failed");
    assert_eq!(json["jobs"][0]["status"]["kind"], "lint");
}

fn checksum(group: &mut BenchmarkGroup) {
    let data: Vec<u64> = (0..256).collect();
    group
        .throughput(Throughput::Elements(256))
        .bench_function("sum", move |b| b.iter(|| data.iter().sum::<u64>()));
    group.bench_function("xor", |b| {
        b.iter_with_setup(|| vec![7u8; 64], |v| v.iter().fold(0u8, |a, x| a ^ x))
    });
}

bench_group!("facade-checksum", checksum);

#[test]
fn registered_group_is_visible_through_the_facade() {
    let groups = registered_groups();
    let group = groups
        .iter()
        .find(|g| g.name() == "facade-checksum")
        .unwrap();
    let ids: Vec<&str> = group.cases().iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["facade-checksum/sum", "facade-checksum/xor"]);
    assert_eq!(group.cases()[0].throughput, Some(Throughput::Elements(256)));
    assert!(group.cases()[1].file.ends_with("integration.rs"));
}

#[test]
fn summary_excludes_outliers_from_mean_but_not_max() {
    let mut samples: Vec<f64> = (0..40).map(|i| 100.0 + (i % 4) as f64).collect();
    samples.push(10_000.0);

    let summary = compute_summary(&samples, Default::default());
    assert!(summary.mean < 110.0);
    assert_eq!(summary.max, 10_000.0);
    assert_eq!(summary.outliers.count(), 1);

    let bootstrap = compute_bootstrap(
        &samples[..40],
        &BootstrapConfig {
            iterations: 1_000,
            ..Default::default()
        },
    )
    .unwrap();
    let ci = bootstrap.confidence_interval;
    assert!(ci.lower <= ci.upper);
    assert!(ci.lower >= 100.0 && ci.upper <= 103.0);
}
