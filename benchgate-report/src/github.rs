//! GitHub Summary Output
//!
//! Markdown for `$GITHUB_STEP_SUMMARY`, for both benchmark reports and
//! pipeline runs.

use crate::format::{format_duration, format_millis, format_throughput};
use crate::report::{BenchmarkStatus, Report};
use benchgate_pipeline::{JobStatus, PipelineRun, PipelineStatus, StepStatus};
use std::fmt::Write;

/// Markdown summary of a benchmark report.
pub fn generate_github_summary(report: &Report) -> String {
    let mut out = String::new();
    out.push_str("## Benchmark Results\n\n");

    let s = &report.summary;
    let _ = writeln!(
        out,
        "**{}** benchmarks: {} passed, {} failed, {} crashed, {} skipped",
        s.total_benchmarks, s.passed, s.failed, s.crashed, s.skipped
    );
    if report.baseline_meta.is_some() {
        let _ = writeln!(
            out,
            "\n{} regression(s), {} improvement(s) against baseline",
            s.regressions, s.improvements
        );
    }
    out.push('\n');

    out.push_str("| Benchmark | Mean | Median | p99 | CI | Throughput | Change |\n");
    out.push_str("|---|---:|---:|---:|---|---:|---:|\n");
    for result in &report.results {
        let icon = match result.status {
            BenchmarkStatus::Passed => "",
            BenchmarkStatus::Failed => ":x: ",
            BenchmarkStatus::Crashed => ":boom: ",
            BenchmarkStatus::Skipped => ":heavy_minus_sign: ",
        };
        let _ = write!(out, "| {icon}`{}` ", result.id);
        match &result.metrics {
            Some(m) => {
                let _ = write!(
                    out,
                    "| {} | {} | {} | {} .. {} | {} ",
                    format_duration(m.mean_ns),
                    format_duration(m.median_ns),
                    format_duration(m.p99_ns),
                    format_duration(m.ci_lower_ns),
                    format_duration(m.ci_upper_ns),
                    m.throughput.as_ref().map(format_throughput).unwrap_or_default(),
                );
            }
            None => out.push_str("| - | - | - | - | - "),
        }
        match &result.comparison {
            Some(c) => {
                let marker = if c.is_regression() {
                    " :warning:"
                } else if c.is_improvement() {
                    " :rocket:"
                } else {
                    ""
                };
                let _ = writeln!(out, "| {:+.2}%{marker} |", c.relative_change);
            }
            None => out.push_str("| |\n"),
        }
    }

    let failures: Vec<_> = report
        .results
        .iter()
        .filter_map(|r| r.failure.as_ref().map(|f| (r, f)))
        .collect();
    if !failures.is_empty() {
        out.push_str("\n### Failures\n\n");
        for (result, failure) in failures {
            let _ = writeln!(
                out,
                "- `{}` ({}:{}): {}",
                result.id, result.file, result.line, failure.message
            );
        }
    }
    out
}

/// Markdown summary of a pipeline run.
pub fn generate_pipeline_summary(run: &PipelineRun) -> String {
    let mut out = String::new();
    let headline = match run.status {
        PipelineStatus::Success => ":white_check_mark: passed",
        PipelineStatus::Failed => ":x: failed",
        PipelineStatus::NotTriggered => ":heavy_minus_sign: not triggered",
    };
    let _ = writeln!(out, "## {} {}\n", run.workflow, headline);
    let _ = writeln!(out, "Event: {}\n", run.event);
    if run.jobs.is_empty() {
        return out;
    }

    out.push_str("| Job | Platform | Status | Duration |\n");
    out.push_str("|---|---|---|---:|\n");
    for job in &run.jobs {
        let status = match &job.status {
            JobStatus::Success => ":white_check_mark: success".to_string(),
            JobStatus::Failed { step, kind } => format!(":x: {kind} failure in `{step}`"),
            JobStatus::Skipped { reason } => format!(":heavy_minus_sign: skipped: {reason}"),
            JobStatus::Cancelled => ":no_entry_sign: cancelled".to_string(),
        };
        let _ = writeln!(
            out,
            "| {} | `{}` | {} | {} |",
            job.name,
            job.platform,
            status,
            format_millis(job.duration_ms)
        );
    }

    let failed: Vec<_> = run
        .jobs
        .iter()
        .flat_map(|j| j.steps.iter().map(move |s| (j, s)))
        .filter_map(|(j, s)| match &s.status {
            StepStatus::Failed { message, .. } => Some((j, s, message)),
            _ => None,
        })
        .collect();
    if !failed.is_empty() {
        out.push_str("\n### Failed steps\n\n");
        for (job, step, message) in failed {
            let _ = writeln!(out, "- **{}** / {}: {}", job.name, step.name, message);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Comparison;
    use crate::test_support::{report_with, result};
    use benchgate_pipeline::{
        FailureKind, JobRun, PipelineRun, SkipReason, StepResult, TriggerEvent,
    };

    #[test]
    fn benchmark_table_rows() {
        let mut slow = result("easing/smoothstep", 2_000.0);
        slow.comparison = Some(Comparison {
            baseline_mean_ns: 1_000.0,
            absolute_change_ns: 1_000.0,
            relative_change: 100.0,
            threshold: 5.0,
            is_significant: true,
            effect_size: 10.0,
        });
        let mut report = report_with(vec![result("easing/enum", 10.0), slow]);
        report.baseline_meta = Some(report.meta.clone());
        report.summary.regressions = 1;

        let md = generate_github_summary(&report);
        assert!(md.contains("| `easing/enum` | 10.00 ns |"));
        assert!(md.contains("| +100.00% :warning: |"));
        assert!(md.contains("1 regression(s)"));
    }

    #[test]
    fn pipeline_table_lists_every_instance() {
        let mut run = PipelineRun::not_triggered("CI", TriggerEvent::PullRequest);
        run.status = PipelineStatus::Failed;
        run.jobs = vec![
            JobRun {
                job_id: "check".into(),
                name: "Check".into(),
                platform: "ubuntu-latest".into(),
                status: JobStatus::Failed {
                    step: "Check formatting".into(),
                    kind: FailureKind::Format,
                },
                steps: vec![StepResult {
                    name: "Check formatting".into(),
                    status: StepStatus::failed(FailureKind::Format, Some(1), "exited with status 1"),
                    duration_ms: 800,
                }],
                duration_ms: 900,
            },
            JobRun {
                job_id: "bench".into(),
                name: "Bench (macos-latest)".into(),
                platform: "macos-latest".into(),
                status: JobStatus::Skipped {
                    reason: SkipReason::DependencyNotMet { job: "check".into() },
                },
                steps: Vec::new(),
                duration_ms: 0,
            },
        ];

        let md = generate_pipeline_summary(&run);
        assert!(md.starts_with("## CI :x: failed\n"));
        assert!(md.contains(":x: format failure in `Check formatting`"));
        assert!(md.contains("| Bench (macos-latest) | `macos-latest` | :heavy_minus_sign: skipped"));
        assert!(md.contains("- **Check** / Check formatting: exited with status 1"));
    }
}
