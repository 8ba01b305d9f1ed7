//! Pipeline executor
//!
//! Runs a plan stage by stage. Inside a stage every instance runs on its own
//! worker of a rayon pool; instances share nothing except their job's
//! fail-fast flag. An instance starts only if every job it needs succeeded
//! on every platform it ran on.

use crate::error::PipelineError;
use crate::event::TriggerEvent;
use crate::plan::{ExecutionPlan, JobInstance, Stage, plan};
use crate::workflow::Workflow;
use crate::runner::{StepContext, StepRunner};
use crate::status::{JobRun, JobStatus, PipelineRun, SkipReason, StepResult, StepStatus};
use chrono::Utc;
use fxhash::FxHashMap;
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Which matrix instances run on this machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlatformPolicy {
    /// Matrix instances run only if their platform matches the host; the
    /// rest are skipped. Single-platform jobs always run on the host.
    #[default]
    HostOnly,
    /// Every instance runs on the host.
    Emulate,
}

/// Executor settings.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Directory steps run in.
    pub workspace: PathBuf,
    /// Maximum instances running at once; defaults to the stage width.
    pub max_parallel: Option<usize>,
    /// Platform handling.
    pub policy: PlatformPolicy,
    /// Step time limit for jobs that set none.
    pub default_timeout: Option<Duration>,
}

impl ExecutorConfig {
    /// Defaults for `workspace`.
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            max_parallel: None,
            policy: PlatformPolicy::default(),
            default_timeout: None,
        }
    }
}

/// Executes plans with a [`StepRunner`].
pub struct PipelineExecutor<R> {
    runner: R,
    config: ExecutorConfig,
}

impl<R: StepRunner> PipelineExecutor<R> {
    /// Executor using `runner`.
    pub fn new(runner: R, config: ExecutorConfig) -> Self {
        Self { runner, config }
    }

    /// Run every stage of `plan`.
    pub fn run(&self, plan: &ExecutionPlan) -> Result<PipelineRun, PipelineError> {
        let started_at = Utc::now();
        info!(workflow = %plan.workflow, event = %plan.event, stages = plan.stages.len(), "starting run");

        let mut succeeded: FxHashMap<String, bool> = FxHashMap::default();
        let mut jobs = Vec::new();
        for stage in &plan.stages {
            let runs = self.run_stage(stage, &succeeded)?;
            for job_id in &stage.jobs {
                succeeded.insert(job_id.clone(), job_succeeded(&runs, job_id));
            }
            jobs.extend(runs);
        }

        let status = PipelineRun::overall(&jobs);
        info!(workflow = %plan.workflow, ?status, "run finished");
        Ok(PipelineRun {
            workflow: plan.workflow.clone(),
            event: plan.event.clone(),
            status,
            jobs,
            started_at,
            finished_at: Utc::now(),
        })
    }

    fn run_stage(
        &self,
        stage: &Stage,
        succeeded: &FxHashMap<String, bool>,
    ) -> Result<Vec<JobRun>, PipelineError> {
        if stage.instances.is_empty() {
            return Ok(Vec::new());
        }
        let cancel: FxHashMap<&str, AtomicBool> = stage
            .jobs
            .iter()
            .map(|id| (id.as_str(), AtomicBool::new(false)))
            .collect();
        let width = stage.instances.len();
        let threads = self.config.max_parallel.unwrap_or(width).clamp(1, width);
        info!(stage = stage.index, jobs = ?stage.jobs, instances = width, threads, "starting stage");

        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| PipelineError::Pool(e.to_string()))?;

        let never = AtomicBool::new(false);
        Ok(pool.install(|| {
            stage
                .instances
                .par_iter()
                .map(|instance| {
                    let flag = cancel.get(instance.job_id.as_str()).unwrap_or(&never);
                    self.run_instance(instance, succeeded, flag)
                })
                .collect()
        }))
    }

    fn run_instance(
        &self,
        instance: &JobInstance,
        succeeded: &FxHashMap<String, bool>,
        cancel: &AtomicBool,
    ) -> JobRun {
        let skipped = |reason: SkipReason| {
            info!(job = %instance.name, %reason, "skipping");
            JobRun {
                job_id: instance.job_id.clone(),
                name: instance.name.clone(),
                platform: instance.platform.to_string(),
                status: JobStatus::Skipped { reason },
                steps: Vec::new(),
                duration_ms: 0,
            }
        };

        if let Some(unmet) = instance
            .needs
            .iter()
            .find(|need| !succeeded.get(need.as_str()).copied().unwrap_or(false))
        {
            return skipped(SkipReason::DependencyNotMet { job: unmet.clone() });
        }
        if self.config.policy == PlatformPolicy::HostOnly
            && instance.from_matrix
            && !instance.platform.matches_host()
        {
            return skipped(SkipReason::NoRunner {
                platform: instance.platform.to_string(),
            });
        }

        info!(job = %instance.name, platform = %instance.platform, "starting job");
        let start = Instant::now();
        let never = AtomicBool::new(false);
        let ctx = StepContext {
            instance,
            workspace: &self.config.workspace,
            timeout: instance.timeout.or(self.config.default_timeout),
            cancelled: if instance.fail_fast { cancel } else { &never },
        };

        let mut failure = None;
        let mut cancelled = false;
        let mut steps = Vec::with_capacity(instance.steps.len());
        for step in &instance.steps {
            if failure.is_some() || cancelled || ctx.cancelled.load(Ordering::Acquire) {
                cancelled |= failure.is_none();
                steps.push(StepResult {
                    name: step.name.clone(),
                    status: StepStatus::NotRun,
                    duration_ms: 0,
                });
                continue;
            }

            let step_start = Instant::now();
            let mut status = self.runner.run_step(&ctx, step);
            if let StepStatus::Failed { message, .. } = &status {
                if step.continue_on_error {
                    warn!(job = %instance.name, step = %step.name, %message, "step failed, continuing");
                    status = StepStatus::Warned {
                        message: message.clone(),
                    };
                }
            }
            match &status {
                StepStatus::Failed { kind, message, .. } => {
                    warn!(job = %instance.name, step = %step.name, %kind, %message, "step failed");
                    failure = Some((step.name.clone(), *kind));
                    if instance.fail_fast {
                        cancel.store(true, Ordering::Release);
                    }
                }
                StepStatus::Warned { message } => {
                    warn!(job = %instance.name, step = %step.name, %message, "step warned");
                }
                StepStatus::Cancelled => cancelled = true,
                StepStatus::Success | StepStatus::NotRun => {}
            }
            steps.push(StepResult {
                name: step.name.clone(),
                status,
                duration_ms: step_start.elapsed().as_millis() as u64,
            });
        }

        let status = match failure {
            Some((step, kind)) => JobStatus::Failed { step, kind },
            None if cancelled => JobStatus::Cancelled,
            None => JobStatus::Success,
        };
        info!(job = %instance.name, ?status, "job finished");
        JobRun {
            job_id: instance.job_id.clone(),
            name: instance.name.clone(),
            platform: instance.platform.to_string(),
            status,
            steps,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }
}

/// Plan and execute `workflow` for `event`.
///
/// An event that does not trigger the workflow yields a
/// [`PipelineStatus::NotTriggered`](crate::status::PipelineStatus) run.
pub fn run_workflow<R: StepRunner>(
    workflow: &Workflow,
    event: &TriggerEvent,
    runner: R,
    config: ExecutorConfig,
) -> Result<PipelineRun, PipelineError> {
    match plan(workflow, event)? {
        Some(plan) => PipelineExecutor::new(runner, config).run(&plan),
        None => Ok(PipelineRun::not_triggered(&workflow.name, event.clone())),
    }
}

/// A job succeeded if at least one instance succeeded and every other
/// instance either succeeded or had no runner.
fn job_succeeded(runs: &[JobRun], job_id: &str) -> bool {
    let mut any = false;
    for run in runs.iter().filter(|r| r.job_id == job_id) {
        match &run.status {
            JobStatus::Success => any = true,
            JobStatus::Skipped {
                reason: SkipReason::NoRunner { .. },
            } => {}
            _ => return false,
        }
    }
    any
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{FailureKind, PipelineStatus};
    use crate::workflow::{JobDef, RunsOn, StepDef};
    use std::sync::Mutex;

    /// Fails the named steps, records everything it ran.
    #[derive(Default)]
    struct Scripted {
        fail: Vec<(&'static str, &'static str, FailureKind)>,
        ran: Mutex<Vec<String>>,
    }

    impl StepRunner for Scripted {
        fn run_step(&self, ctx: &StepContext<'_>, step: &StepDef) -> StepStatus {
            self.ran
                .lock()
                .unwrap()
                .push(format!("{}:{}", ctx.instance.name, step.name));
            match self
                .fail
                .iter()
                .find(|(job, name, _)| ctx.instance.name == *job && step.name == *name)
            {
                Some((_, _, kind)) => StepStatus::failed(*kind, Some(1), "scripted"),
                None => StepStatus::Success,
            }
        }
    }

    fn execute(wf: &Workflow, runner: &Scripted) -> PipelineRun {
        let plan = plan(wf, &TriggerEvent::PullRequest).unwrap().unwrap();
        let mut config = ExecutorConfig::new(".");
        config.policy = PlatformPolicy::Emulate;
        PipelineExecutor::new(runner, config).run(&plan).unwrap()
    }

    #[test]
    fn green_run_runs_everything() {
        let runner = Scripted::default();
        let run = execute(&Workflow::standard(), &runner);
        assert_eq!(run.status, PipelineStatus::Success);
        assert_eq!(run.jobs.len(), 5);
        assert!(run.jobs.iter().all(|j| j.status == JobStatus::Success));
        assert_eq!(runner.ran.lock().unwrap().len(), 5 + 4 * 4);
    }

    #[test]
    fn check_runs_before_any_bench() {
        let runner = Scripted::default();
        execute(&Workflow::standard(), &runner);
        let ran = runner.ran.lock().unwrap();
        let last_check = ran.iter().rposition(|s| s.starts_with("Check:")).unwrap();
        let first_bench = ran.iter().position(|s| s.starts_with("Bench (")).unwrap();
        assert!(last_check < first_bench);
    }

    #[test]
    fn format_failure_skips_bench() {
        let runner = Scripted {
            fail: vec![("Check", "Check formatting", FailureKind::Format)],
            ..Default::default()
        };
        let run = execute(&Workflow::standard(), &runner);
        assert_eq!(run.status, PipelineStatus::Failed);

        let check = &run.job("check")[0];
        assert_eq!(
            check.status,
            JobStatus::Failed {
                step: "Check formatting".into(),
                kind: FailureKind::Format
            }
        );
        let tail: Vec<&StepStatus> = check.steps[3..].iter().map(|s| &s.status).collect();
        assert_eq!(tail, vec![&StepStatus::NotRun, &StepStatus::NotRun]);

        let bench = run.job("bench");
        assert_eq!(bench.len(), 4);
        assert!(bench.iter().all(|b| b.status
            == JobStatus::Skipped {
                reason: SkipReason::DependencyNotMet { job: "check".into() }
            }));
        assert!(runner.ran.lock().unwrap().iter().all(|s| !s.starts_with("Bench")));
    }

    #[test]
    fn bench_failures_are_independent() {
        let runner = Scripted {
            fail: vec![("Bench (windows-latest)", "Run benchmarks", FailureKind::Benchmark)],
            ..Default::default()
        };
        let run = execute(&Workflow::standard(), &runner);
        assert_eq!(run.status, PipelineStatus::Failed);
        let bench = run.job("bench");
        let failed = bench.iter().filter(|b| !b.status.is_success()).count();
        assert_eq!(failed, 1);
        assert_eq!(run.first_failure().map(|(_, k)| k), Some(FailureKind::Benchmark));
    }

    #[test]
    fn fail_fast_matrix_cancels_later_instances() {
        let wf = Workflow {
            jobs: vec![JobDef::new(
                "m",
                "M",
                RunsOn::Matrix {
                    matrix: vec!["ubuntu-latest".into(), "windows-latest".into()],
                },
            )
            .step(StepDef::run("a", "true"))
            .step(StepDef::run("b", "true"))],
            ..Workflow::standard()
        };
        let runner = Scripted {
            fail: vec![("M (ubuntu-latest)", "a", FailureKind::Command)],
            ..Default::default()
        };
        let plan = plan(&wf, &TriggerEvent::PullRequest).unwrap().unwrap();
        let mut config = ExecutorConfig::new(".");
        config.policy = PlatformPolicy::Emulate;
        config.max_parallel = Some(1);
        let run = PipelineExecutor::new(&runner, config).run(&plan).unwrap();

        assert!(matches!(run.jobs[0].status, JobStatus::Failed { .. }));
        assert_eq!(run.jobs[1].status, JobStatus::Cancelled);
    }

    #[test]
    fn continue_on_error_downgrades_failure() {
        let mut step = StepDef::run("flaky", "true");
        step.continue_on_error = true;
        let wf = Workflow {
            jobs: vec![JobDef::new("j", "J", RunsOn::Fixed("ubuntu-latest".into()))
                .step(step)
                .step(StepDef::run("after", "true"))],
            ..Workflow::standard()
        };
        let runner = Scripted {
            fail: vec![("J", "flaky", FailureKind::Command)],
            ..Default::default()
        };
        let run = execute(&wf, &runner);
        assert_eq!(run.status, PipelineStatus::Success);
        assert!(matches!(run.jobs[0].steps[0].status, StepStatus::Warned { .. }));
        assert_eq!(run.jobs[0].steps[1].status, StepStatus::Success);
    }

    #[test]
    fn host_only_skips_foreign_matrix_platforms() {
        let runner = Scripted::default();
        let plan = plan(&Workflow::standard(), &TriggerEvent::PullRequest)
            .unwrap()
            .unwrap();
        let run = PipelineExecutor::new(&runner, ExecutorConfig::new("."))
            .run(&plan)
            .unwrap();
        assert_eq!(run.job("check")[0].status, JobStatus::Success);
        let ran_bench = run.job("bench").iter().filter(|b| b.status.is_success()).count();
        let no_runner = run
            .job("bench")
            .iter()
            .filter(|b| matches!(b.status, JobStatus::Skipped { reason: SkipReason::NoRunner { .. } }))
            .count();
        assert_eq!(ran_bench + no_runner, 4);
        assert!(ran_bench <= 1);
        assert_eq!(run.status, PipelineStatus::Success);
    }
}
