#![warn(missing_docs)]
//! Benchgate Pipeline - Check and Bench Workflow
//!
//! Models a CI workflow of jobs and steps, validates its job graph, expands
//! build matrices into per-platform instances and runs them locally:
//! - `workflow`: jobs, steps, triggers and the built-in standard workflow
//! - `validate` / `graph`: structural rules and stage ordering
//! - `plan`: matrix expansion for one triggering event
//! - `executor` / `runner`: stage-by-stage execution with fail-fast
//! - `cache`: lockfile-keyed dependency cache

mod cache;
mod error;
mod event;
mod executor;
mod graph;
mod plan;
mod runner;
mod status;
mod validate;
mod workflow;

pub use cache::{CacheOutcome, LocalCache, cache_key, lockfile_digest};
pub use error::{CacheError, PipelineError};
pub use event::TriggerEvent;
pub use executor::{ExecutorConfig, PipelineExecutor, PlatformPolicy, run_workflow};
pub use graph::{DependencyGraph, GraphError};
pub use plan::{ExecutionPlan, JobInstance, Stage, plan};
pub use runner::{CommandRunner, StepContext, StepRunner};
pub use status::{
    FailureKind, JobRun, JobStatus, PipelineRun, PipelineStatus, SkipReason, StepResult,
    StepStatus,
};
pub use validate::{ValidationError, ValidationErrors, job_graph, validate};
pub use workflow::{
    ActionRef, Arch, BENCH_PLATFORMS, CACHE_KEY_TEMPLATE, JobDef, OsFamily, Platform, RunsOn,
    StepAction, StepDef, StepKind, Triggers, Workflow,
};
