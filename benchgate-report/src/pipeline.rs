//! Pipeline Output
//!
//! Terminal rendering of execution plans and pipeline runs.

use crate::format::format_millis;
use benchgate_pipeline::{ExecutionPlan, JobStatus, PipelineRun, PipelineStatus, StepStatus};
use std::fmt::Write;

/// Stages and instances of a plan, as a tree.
pub fn format_plan(plan: &ExecutionPlan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({}):", plan.workflow, plan.event);
    for stage in &plan.stages {
        let _ = writeln!(out, "├── stage {}: {}", stage.index, stage.jobs.join(", "));
        for instance in &stage.instances {
            let needs = if instance.needs.is_empty() {
                String::new()
            } else {
                format!(" needs [{}]", instance.needs.join(", "))
            };
            let _ = writeln!(
                out,
                "│   ├── {} on {}{} ({} steps)",
                instance.name,
                instance.platform,
                needs,
                instance.steps.len()
            );
        }
    }
    let _ = writeln!(out, "{} instance(s) in {} stage(s).", plan.instances().count(), plan.stages.len());
    out
}

/// Per-instance outcome with step detail for anything that did not pass.
pub fn format_pipeline_human(run: &PipelineRun) -> String {
    let mut out = String::new();
    out.push('\n');
    let _ = writeln!(out, "{} ({})", run.workflow, run.event);
    out.push_str(&"=".repeat(60));
    out.push('\n');

    if run.status == PipelineStatus::NotTriggered {
        out.push_str("Not triggered: no job scheduled.\n");
        return out;
    }

    for job in &run.jobs {
        let (icon, detail) = match &job.status {
            JobStatus::Success => ("✓", String::new()),
            JobStatus::Failed { step, kind } => ("✗", format!(" ({kind} failure in {step})")),
            JobStatus::Skipped { reason } => ("⊘", format!(" (skipped: {reason})")),
            JobStatus::Cancelled => ("⊘", " (cancelled)".to_string()),
        };
        let _ = writeln!(
            out,
            "  {icon} {} [{}]{detail}",
            job.name,
            format_millis(job.duration_ms)
        );
        if job.status.is_success() {
            continue;
        }
        for step in &job.steps {
            let line = match &step.status {
                StepStatus::Success => format!("✓ {}", step.name),
                StepStatus::Failed { message, .. } => format!("✗ {}: {message}", step.name),
                StepStatus::Warned { message } => format!("! {}: {message}", step.name),
                StepStatus::Cancelled => format!("⊘ {} (cancelled)", step.name),
                StepStatus::NotRun => format!("· {} (not run)", step.name),
            };
            let _ = writeln!(out, "      {line}");
        }
    }

    let verdict = match run.status {
        PipelineStatus::Success => "passed",
        _ => "failed",
    };
    let elapsed = (run.finished_at - run.started_at).num_milliseconds().max(0) as u64;
    let _ = writeln!(out, "\nPipeline {verdict} in {}", format_millis(elapsed));
    out
}
