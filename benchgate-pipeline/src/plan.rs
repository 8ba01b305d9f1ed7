//! Execution planning
//!
//! Expands each job's matrix into instances and orders them into stages.
//! Every instance in a stage depends only on instances in earlier stages.

use crate::error::PipelineError;
use crate::event::TriggerEvent;
use crate::validate::{job_graph, validate};
use crate::workflow::{JobDef, Platform, StepDef, Workflow};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// One job bound to one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInstance {
    /// Id of the job this instance expands.
    pub job_id: String,
    /// `Name` or, for matrix jobs, `Name (platform)`.
    pub name: String,
    /// Runner platform.
    pub platform: Platform,
    /// Whether the job is a matrix job.
    pub from_matrix: bool,
    /// Jobs that must have succeeded.
    pub needs: Vec<String>,
    /// Steps in order.
    pub steps: Vec<StepDef>,
    /// Environment for every step.
    pub env: BTreeMap<String, String>,
    /// Cancel siblings after a failure.
    pub fail_fast: bool,
    /// Per-step time limit.
    pub timeout: Option<Duration>,
}

impl JobInstance {
    fn expand(job: &JobDef, env: &BTreeMap<String, String>) -> Vec<JobInstance> {
        let from_matrix = job.runs_on.is_matrix();
        job.runs_on
            .platforms()
            .iter()
            .map(|platform| JobInstance {
                job_id: job.id.clone(),
                name: if from_matrix {
                    format!("{} ({})", job.name, platform)
                } else {
                    job.name.clone()
                },
                platform: platform.clone(),
                from_matrix,
                needs: job.needs.clone(),
                steps: job.steps.clone(),
                env: env.clone(),
                fail_fast: job.fail_fast,
                timeout: job.timeout(),
            })
            .collect()
    }
}

/// Instances that may run concurrently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    /// Position in the plan, from 0.
    pub index: usize,
    /// Jobs in this stage, in declaration order.
    pub jobs: Vec<String>,
    /// Their instances.
    pub instances: Vec<JobInstance>,
}

/// Ordered stages for one triggering event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    /// Workflow name.
    pub workflow: String,
    /// Event the plan was made for.
    pub event: TriggerEvent,
    /// Stages in execution order.
    pub stages: Vec<Stage>,
}

impl ExecutionPlan {
    /// Every instance in execution order.
    pub fn instances(&self) -> impl Iterator<Item = &JobInstance> {
        self.stages.iter().flat_map(|s| s.instances.iter())
    }

    /// Instances of one job.
    pub fn instances_of<'a>(&'a self, job_id: &'a str) -> impl Iterator<Item = &'a JobInstance> {
        self.instances().filter(move |i| i.job_id == job_id)
    }

    /// Stage index holding `job_id`.
    pub fn stage_of(&self, job_id: &str) -> Option<usize> {
        self.stages
            .iter()
            .find(|s| s.jobs.iter().any(|j| j == job_id))
            .map(|s| s.index)
    }
}

/// Plan `workflow` for `event`.
///
/// Returns `Ok(None)` when the event does not trigger the workflow.
pub fn plan(workflow: &Workflow, event: &TriggerEvent) -> Result<Option<ExecutionPlan>, PipelineError> {
    validate(workflow)?;

    if !workflow.triggers.matches(event) {
        debug!(workflow = %workflow.name, %event, "event does not trigger workflow");
        return Ok(None);
    }

    let levels = job_graph(workflow).stages()?;
    let stages = levels
        .into_iter()
        .enumerate()
        .map(|(index, jobs)| {
            let instances = jobs
                .iter()
                .filter_map(|id| workflow.job(id))
                .flat_map(|job| JobInstance::expand(job, &workflow.env))
                .collect::<Vec<_>>();
            debug!(stage = index, jobs = ?jobs, instances = instances.len(), "planned stage");
            Stage {
                index,
                jobs,
                instances,
            }
        })
        .collect();

    Ok(Some(ExecutionPlan {
        workflow: workflow.name.clone(),
        event: event.clone(),
        stages,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard(event: TriggerEvent) -> Option<ExecutionPlan> {
        plan(&Workflow::standard(), &event).unwrap()
    }

    #[test]
    fn check_scheduled_once_per_event() {
        for event in [TriggerEvent::push("main"), TriggerEvent::PullRequest] {
            let plan = standard(event).unwrap();
            assert_eq!(plan.instances_of("check").count(), 1);
        }
    }

    #[test]
    fn other_branches_schedule_nothing() {
        assert!(standard(TriggerEvent::push("topic")).is_none());
    }

    #[test]
    fn bench_fans_out_after_check() {
        let plan = standard(TriggerEvent::PullRequest).unwrap();
        assert_eq!(plan.stages.len(), 2);
        assert_eq!(plan.stage_of("check"), Some(0));
        assert_eq!(plan.stage_of("bench"), Some(1));

        let bench: Vec<&JobInstance> = plan.instances_of("bench").collect();
        assert_eq!(bench.len(), 4);
        let mut platforms: Vec<&str> = bench.iter().map(|i| i.platform.as_str()).collect();
        platforms.sort_unstable();
        platforms.dedup();
        assert_eq!(platforms.len(), 4);
        assert_eq!(bench[3].name, "Bench (ubuntu-24.04-arm)");
        assert!(bench.iter().all(|i| i.needs == ["check"] && !i.fail_fast));
    }

    #[test]
    fn env_reaches_every_instance() {
        let plan = standard(TriggerEvent::push("main")).unwrap();
        assert!(plan
            .instances()
            .all(|i| i.env.get("CARGO_TERM_COLOR").map(String::as_str) == Some("always")));
    }

    #[test]
    fn invalid_workflow_not_planned() {
        let mut wf = Workflow::standard();
        wf.jobs[1].needs.push("bench".into());
        assert!(matches!(
            plan(&wf, &TriggerEvent::PullRequest),
            Err(PipelineError::Invalid(_))
        ));
    }
}
