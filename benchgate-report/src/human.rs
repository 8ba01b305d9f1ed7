//! Human-readable Output
//!
//! Terminal output for benchmark reports: results grouped by group name,
//! one block per case, then a summary.

use crate::format::{format_duration, format_throughput};
use crate::report::{BenchmarkReportResult, BenchmarkStatus, Report};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Format a report for terminal display.
pub fn format_human_output(report: &Report) -> String {
    let mut out = String::new();

    out.push('\n');
    out.push_str("benchgate results\n");
    out.push_str(&"=".repeat(60));
    out.push_str("\n\n");

    if let Some(baseline) = &report.baseline_meta {
        let _ = writeln!(
            out,
            "Baseline: {} ({})",
            baseline.git_commit.as_deref().unwrap_or("unknown"),
            baseline.timestamp.format("%Y-%m-%d %H:%M:%S")
        );
        let _ = writeln!(
            out,
            "Current:  {} ({})\n",
            report.meta.git_commit.as_deref().unwrap_or("unknown"),
            report.meta.timestamp.format("%Y-%m-%d %H:%M:%S")
        );
    }

    let mut groups: BTreeMap<&str, Vec<&BenchmarkReportResult>> = BTreeMap::new();
    for result in &report.results {
        groups.entry(&result.group).or_default().push(result);
    }

    for (group, results) in groups {
        let _ = writeln!(out, "Group: {group}");
        out.push_str(&"-".repeat(60));
        out.push('\n');
        for result in results {
            format_result(&mut out, result);
        }
    }

    let s = &report.summary;
    out.push_str("Summary\n");
    out.push_str(&"-".repeat(60));
    out.push('\n');
    let _ = writeln!(
        out,
        "  Total: {}  Passed: {}  Failed: {}  Crashed: {}  Skipped: {}",
        s.total_benchmarks, s.passed, s.failed, s.crashed, s.skipped
    );
    if report.baseline_meta.is_some() {
        let _ = writeln!(
            out,
            "  Regressions: {}  Improvements: {}",
            s.regressions, s.improvements
        );
    }
    let _ = writeln!(out, "  Duration: {:.2} ms", s.total_duration_ms);
    out
}

fn format_result(out: &mut String, result: &BenchmarkReportResult) {
    let icon = match result.status {
        BenchmarkStatus::Passed => "✓",
        BenchmarkStatus::Failed => "✗",
        BenchmarkStatus::Crashed => "💥",
        BenchmarkStatus::Skipped => "⊘",
    };
    let _ = writeln!(out, "  {icon} {}", result.id);

    if let Some(m) = &result.metrics {
        let _ = writeln!(
            out,
            "      mean: {}  median: {}  stddev: {}",
            format_duration(m.mean_ns),
            format_duration(m.median_ns),
            format_duration(m.std_dev_ns)
        );
        let _ = writeln!(
            out,
            "      min: {}  max: {}  samples: {}  outliers: {}",
            format_duration(m.min_ns),
            format_duration(m.max_ns),
            m.samples,
            m.outliers
        );
        let _ = writeln!(
            out,
            "      p50: {}  p95: {}  p99: {}",
            format_duration(m.p50_ns),
            format_duration(m.p95_ns),
            format_duration(m.p99_ns)
        );
        if m.ci_level > 0.0 {
            let _ = writeln!(
                out,
                "      {:.0}% CI: [{}, {}]",
                m.ci_level * 100.0,
                format_duration(m.ci_lower_ns),
                format_duration(m.ci_upper_ns)
            );
        }
        if let Some(rate) = &m.throughput {
            let _ = writeln!(out, "      throughput: {}", format_throughput(rate));
        }
        if m.mean_cycles > 0.0 {
            let _ = writeln!(
                out,
                "      cycles: mean {:.0}  median {:.0}  ({:.2} GHz)",
                m.mean_cycles, m.median_cycles, m.cycles_per_ns
            );
        }
    }

    if let Some(c) = &result.comparison {
        let verdict = if c.is_regression() {
            "REGRESSION"
        } else if c.is_improvement() {
            "improvement"
        } else {
            "no change"
        };
        let _ = writeln!(
            out,
            "      change: {:+.2}% ({} → {}) {verdict}",
            c.relative_change,
            format_duration(c.baseline_mean_ns),
            format_duration(c.baseline_mean_ns + c.absolute_change_ns),
        );
    }

    if let Some(failure) = &result.failure {
        let _ = writeln!(out, "      error: {}", failure.message);
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{Comparison, FailureInfo};
    use crate::test_support::{report_with, result};

    #[test]
    fn groups_and_summary() {
        let mut crashed = result("quat/slerp", 0.0);
        crashed.status = BenchmarkStatus::Crashed;
        crashed.metrics = None;
        crashed.failure = Some(FailureInfo {
            kind: "panic".into(),
            message: "index out of bounds".into(),
        });
        let mut report = report_with(vec![result("easing/enum", 1_500.0), crashed]);
        report.summary.passed = 1;
        report.summary.crashed = 1;

        let text = format_human_output(&report);
        let easing = text.find("Group: easing").unwrap();
        let quat = text.find("Group: quat").unwrap();
        assert!(easing < quat);
        assert!(text.contains("  ✓ easing/enum\n      mean: 1.50 µs"));
        assert!(text.contains("  💥 quat/slerp\n      error: index out of bounds"));
        assert!(text.contains("Passed: 1  Failed: 0  Crashed: 1"));
        assert!(!text.contains("Regressions"));
    }

    #[test]
    fn comparison_line() {
        let mut r = result("lerp/f32", 108.0);
        r.comparison = Some(Comparison {
            baseline_mean_ns: 100.0,
            absolute_change_ns: 8.0,
            relative_change: 8.0,
            threshold: 5.0,
            is_significant: true,
            effect_size: 4.0,
        });
        let mut report = report_with(vec![r]);
        report.baseline_meta = Some(report.meta.clone());
        let text = format_human_output(&report);
        assert!(text.contains("change: +8.00% (100.00 ns → 108.00 ns) REGRESSION"));
        assert!(text.contains("Regressions: 0  Improvements: 0"));
    }
}
