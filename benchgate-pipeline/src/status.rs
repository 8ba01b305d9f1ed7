//! Run status
//!
//! What happened to each step, each job instance and the run as a whole.

use crate::event::TriggerEvent;
use crate::workflow::StepKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Code is not formatted.
    Format,
    /// A lint fired.
    Lint,
    /// The code does not compile.
    Compile,
    /// The benchmark run failed.
    Benchmark,
    /// Checkout, toolchain or process spawn failed.
    Setup,
    /// The step ran past its time limit.
    Timeout,
    /// Any other command failed.
    Command,
}

impl From<StepKind> for FailureKind {
    fn from(kind: StepKind) -> Self {
        match kind {
            StepKind::Format => FailureKind::Format,
            StepKind::Lint => FailureKind::Lint,
            StepKind::Compile => FailureKind::Compile,
            StepKind::Bench => FailureKind::Benchmark,
            StepKind::Other => FailureKind::Command,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureKind::Format => "format",
            FailureKind::Lint => "lint",
            FailureKind::Compile => "compile",
            FailureKind::Benchmark => "benchmark",
            FailureKind::Setup => "setup",
            FailureKind::Timeout => "timeout",
            FailureKind::Command => "command",
        })
    }
}

/// Outcome of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    /// Completed successfully.
    Success,
    /// Failed; the job fails.
    Failed {
        /// Classification.
        kind: FailureKind,
        /// Process exit code, when there was one.
        exit_code: Option<i32>,
        /// Human-readable detail.
        message: String,
    },
    /// Failed, but tolerated.
    Warned {
        /// Human-readable detail.
        message: String,
    },
    /// Stopped because a sibling instance failed.
    Cancelled,
    /// Never started because an earlier step failed.
    NotRun,
}

impl StepStatus {
    /// A failure of `kind`.
    pub fn failed(kind: FailureKind, exit_code: Option<i32>, message: impl Into<String>) -> Self {
        StepStatus::Failed {
            kind,
            exit_code,
            message: message.into(),
        }
    }

    /// Whether later steps may run.
    pub fn is_ok(&self) -> bool {
        matches!(self, StepStatus::Success | StepStatus::Warned { .. })
    }
}

/// A step and its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    /// Step name.
    pub name: String,
    /// Outcome.
    #[serde(flatten)]
    pub status: StepStatus,
    /// Wall-clock time in milliseconds.
    pub duration_ms: u64,
}

/// Why an instance did not run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// A needed job did not succeed.
    DependencyNotMet {
        /// The job.
        job: String,
    },
    /// No local runner for the platform.
    NoRunner {
        /// The platform.
        platform: String,
    },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::DependencyNotMet { job } => write!(f, "needed job `{job}` did not succeed"),
            SkipReason::NoRunner { platform } => write!(f, "no local runner for {platform}"),
        }
    }
}

/// Outcome of one job instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    /// Every step succeeded or was tolerated.
    Success,
    /// A step failed.
    Failed {
        /// Failing step.
        step: String,
        /// Classification.
        kind: FailureKind,
    },
    /// Not run.
    Skipped {
        /// Why.
        reason: SkipReason,
    },
    /// Stopped by fail-fast.
    Cancelled,
}

impl JobStatus {
    /// Whether dependents may run.
    pub fn is_success(&self) -> bool {
        matches!(self, JobStatus::Success)
    }

    /// Whether this outcome fails the run.
    pub fn fails_run(&self) -> bool {
        match self {
            JobStatus::Success => false,
            JobStatus::Skipped { reason } => !matches!(reason, SkipReason::NoRunner { .. }),
            JobStatus::Failed { .. } | JobStatus::Cancelled => true,
        }
    }
}

/// One executed (or skipped) job instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRun {
    /// Job id.
    pub job_id: String,
    /// Instance display name.
    pub name: String,
    /// Runner platform.
    pub platform: String,
    /// Outcome.
    pub status: JobStatus,
    /// Step outcomes; empty when skipped.
    pub steps: Vec<StepResult>,
    /// Wall-clock time in milliseconds.
    pub duration_ms: u64,
}

/// Overall outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    /// Nothing failed.
    Success,
    /// At least one instance failed, was cancelled or was skipped because
    /// of a failure.
    Failed,
    /// The event did not trigger the workflow.
    NotTriggered,
}

impl PipelineStatus {
    /// Process exit code for this status.
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineStatus::Success | PipelineStatus::NotTriggered => 0,
            PipelineStatus::Failed => 1,
        }
    }
}

/// A whole workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRun {
    /// Workflow name.
    pub workflow: String,
    /// Triggering event.
    pub event: TriggerEvent,
    /// Overall outcome.
    pub status: PipelineStatus,
    /// Instances in execution order.
    pub jobs: Vec<JobRun>,
    /// Start time.
    pub started_at: DateTime<Utc>,
    /// End time.
    pub finished_at: DateTime<Utc>,
}

impl PipelineRun {
    /// A run for an event that triggered nothing.
    pub fn not_triggered(workflow: impl Into<String>, event: TriggerEvent) -> Self {
        let now = Utc::now();
        Self {
            workflow: workflow.into(),
            event,
            status: PipelineStatus::NotTriggered,
            jobs: Vec::new(),
            started_at: now,
            finished_at: now,
        }
    }

    /// Derive the overall status from the instance outcomes.
    pub fn overall(jobs: &[JobRun]) -> PipelineStatus {
        if jobs.iter().any(|j| j.status.fails_run()) {
            PipelineStatus::Failed
        } else {
            PipelineStatus::Success
        }
    }

    /// Instances of one job.
    pub fn job(&self, job_id: &str) -> Vec<&JobRun> {
        self.jobs.iter().filter(|j| j.job_id == job_id).collect()
    }

    /// First failure in execution order.
    pub fn first_failure(&self) -> Option<(&JobRun, FailureKind)> {
        self.jobs.iter().find_map(|j| match j.status {
            JobStatus::Failed { kind, .. } => Some((j, kind)),
            _ => None,
        })
    }
}
