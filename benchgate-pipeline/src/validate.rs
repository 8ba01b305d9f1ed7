//! Structural validation of a workflow.
//!
//! Every violation is collected so a broken workflow file can be fixed in
//! one pass.

use crate::graph::{DependencyGraph, GraphError};
use crate::workflow::{StepAction, Workflow};
use fxhash::FxHashSet;
use std::fmt;
use thiserror::Error;

/// One structural problem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No event can start the workflow.
    #[error("workflow has no triggers")]
    NoTriggers,
    /// Two jobs share an id.
    #[error("job `{0}` is defined more than once")]
    DuplicateJob(String),
    /// A `needs` entry names no job.
    #[error("job `{job}` needs unknown job `{need}`")]
    UnknownNeed {
        /// Job with the bad entry.
        job: String,
        /// The missing job.
        need: String,
    },
    /// A job needs itself.
    #[error("job `{0}` needs itself")]
    SelfNeed(String),
    /// The jobs form a cycle.
    #[error("jobs form a cycle through `{0}`")]
    Cycle(String),
    /// A job has no steps.
    #[error("job `{0}` has no steps")]
    NoSteps(String),
    /// A `run` step has a blank command.
    #[error("step `{step}` of job `{job}` has an empty command")]
    EmptyCommand {
        /// Owning job.
        job: String,
        /// Step name.
        step: String,
    },
    /// A matrix lists no platforms.
    #[error("job `{0}` has an empty platform matrix")]
    EmptyMatrix(String),
    /// A matrix lists a platform twice.
    #[error("job `{job}` lists platform `{platform}` more than once")]
    DuplicatePlatform {
        /// Owning job.
        job: String,
        /// Repeated platform.
        platform: String,
    },
}

/// All problems found in a workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    /// The individual problems.
    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Build the job graph from well-formed `needs` entries only.
pub fn job_graph(workflow: &Workflow) -> DependencyGraph {
    let ids: FxHashSet<&str> = workflow.jobs.iter().map(|j| j.id.as_str()).collect();
    let mut graph = DependencyGraph::new();
    for job in &workflow.jobs {
        graph.add_node(job.id.clone());
        for need in &job.needs {
            if need != &job.id && ids.contains(need.as_str()) {
                graph.add_dependency(job.id.clone(), need.clone());
            }
        }
    }
    graph
}

/// Check `workflow` against every structural rule.
pub fn validate(workflow: &Workflow) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();

    if workflow.triggers.is_empty() {
        errors.push(ValidationError::NoTriggers);
    }

    let mut seen = FxHashSet::default();
    for job in &workflow.jobs {
        if !seen.insert(job.id.as_str()) {
            errors.push(ValidationError::DuplicateJob(job.id.clone()));
        }
    }

    for job in &workflow.jobs {
        for need in &job.needs {
            if need == &job.id {
                errors.push(ValidationError::SelfNeed(job.id.clone()));
            } else if !seen.contains(need.as_str()) {
                errors.push(ValidationError::UnknownNeed {
                    job: job.id.clone(),
                    need: need.clone(),
                });
            }
        }

        if job.steps.is_empty() {
            errors.push(ValidationError::NoSteps(job.id.clone()));
        }
        for step in &job.steps {
            if let StepAction::Run { command, .. } = &step.action {
                if command.trim().is_empty() {
                    errors.push(ValidationError::EmptyCommand {
                        job: job.id.clone(),
                        step: step.name.clone(),
                    });
                }
            }
        }

        let platforms = job.runs_on.platforms();
        if platforms.is_empty() {
            errors.push(ValidationError::EmptyMatrix(job.id.clone()));
        }
        let mut distinct = FxHashSet::default();
        for platform in platforms {
            if !distinct.insert(platform.as_str()) {
                errors.push(ValidationError::DuplicatePlatform {
                    job: job.id.clone(),
                    platform: platform.to_string(),
                });
            }
        }
    }

    if let Err(GraphError::CycleDetected(node)) = job_graph(workflow).topological_sort() {
        errors.push(ValidationError::Cycle(node));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(errors))
    }
}
