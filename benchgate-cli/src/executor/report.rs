//! Report Building
//!
//! ```text
//! BenchExecutionResult + SummaryStatistics
//!              │
//!              ▼
//!   ┌─────────────────────┐
//!   │ Parallel Bootstrap  │  one interval per case on the rayon pool
//!   └──────────┬──────────┘
//!              ▼
//!   ┌─────────────────────┐
//!   │  BenchmarkMetrics   │  timing, CI, throughput, cycles
//!   └──────────┬──────────┘
//!              ▼
//!           Report
//! ```

use super::execution::{BenchExecutionResult, ExecutionConfig};
use super::metadata::build_report_meta;
use benchgate_report::{
    BenchmarkMetrics, BenchmarkReportResult, BenchmarkStatus, Report, ReportSummary,
    ThroughputRate,
};
use benchgate_stats::{BootstrapConfig, SummaryStatistics, compute_bootstrap, compute_cycles_stats};
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::debug;

/// Build a report from execution results and their statistics.
///
/// A case whose interval cannot be computed (too few samples, or bootstrap
/// disabled) reports the mean as both bounds and a level of 0.
pub fn build_report(
    results: &[BenchExecutionResult],
    stats: &[(String, Option<SummaryStatistics>)],
    config: &ExecutionConfig,
    total_duration_ms: f64,
) -> Report {
    let stats_map: HashMap<&str, &SummaryStatistics> = stats
        .iter()
        .filter_map(|(id, s)| s.as_ref().map(|s| (id.as_str(), s)))
        .collect();

    let metrics: Vec<Option<BenchmarkMetrics>> = results
        .par_iter()
        .map(|result| {
            let s = stats_map.get(result.benchmark_id.as_str())?;
            Some(metrics_for(result, s, config))
        })
        .collect();

    let mut summary = ReportSummary {
        total_benchmarks: results.len(),
        total_duration_ms,
        ..Default::default()
    };
    let mut report_results = Vec::with_capacity(results.len());

    for (result, metrics) in results.iter().zip(metrics) {
        match result.status {
            BenchmarkStatus::Passed => summary.passed += 1,
            BenchmarkStatus::Failed => summary.failed += 1,
            BenchmarkStatus::Crashed => summary.crashed += 1,
            BenchmarkStatus::Skipped => summary.skipped += 1,
        }
        report_results.push(BenchmarkReportResult {
            id: result.benchmark_id.clone(),
            name: result.benchmark_name.clone(),
            group: result.group.clone(),
            status: result.status,
            file: result.file.clone(),
            line: result.line,
            metrics,
            comparison: None,
            failure: result.failure.clone(),
        });
    }

    Report {
        meta: build_report_meta(config),
        results: report_results,
        summary,
        baseline_meta: None,
    }
}

fn metrics_for(
    result: &BenchExecutionResult,
    stats: &SummaryStatistics,
    config: &ExecutionConfig,
) -> BenchmarkMetrics {
    let mut metrics = BenchmarkMetrics::from(stats);
    metrics.iterations = result.iterations;

    if config.bootstrap_iterations > 0 {
        let bootstrap = BootstrapConfig {
            iterations: config.bootstrap_iterations,
            confidence_level: config.confidence_level,
            ..Default::default()
        };
        match compute_bootstrap(&result.samples, &bootstrap) {
            Ok(b) => {
                metrics.ci_lower_ns = b.confidence_interval.lower;
                metrics.ci_upper_ns = b.confidence_interval.upper;
                metrics.ci_level = b.confidence_interval.level;
            }
            Err(e) => debug!(case = %result.benchmark_id, error = %e, "no confidence interval"),
        }
    }

    metrics.throughput = ThroughputRate::from_mean(result.throughput, stats.mean);

    let cycles = compute_cycles_stats(&result.cpu_cycles, &result.samples);
    metrics.mean_cycles = cycles.mean_cycles;
    metrics.median_cycles = cycles.median_cycles;
    metrics.cycles_per_ns = cycles.cycles_per_ns;
    metrics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::compute_statistics;
    use benchgate_core::Throughput;
    use benchgate_report::{FailureInfo, ThroughputUnit};

    fn result(id: &str, samples: Vec<f64>, status: BenchmarkStatus) -> BenchExecutionResult {
        BenchExecutionResult {
            benchmark_id: id.to_string(),
            benchmark_name: id.rsplit('/').next().unwrap_or(id).to_string(),
            group: "g".to_string(),
            file: "benches/g.rs".to_string(),
            line: 3,
            status,
            cpu_cycles: samples.iter().map(|&ns| (ns * 3.0) as u64).collect(),
            samples,
            iterations: 1_000,
            throughput: Some(Throughput::Bytes(1024)),
            duration_ns: 1,
            failure: None,
        }
    }

    #[test]
    fn metrics_and_summary() {
        let samples: Vec<f64> = (0..50).map(|i| 100.0 + (i % 5) as f64).collect();
        let mut crashed = result("g/crash", Vec::new(), BenchmarkStatus::Crashed);
        crashed.failure = Some(FailureInfo {
            kind: "panic".into(),
            message: "boom".into(),
        });
        let results = vec![result("g/copy", samples, BenchmarkStatus::Passed), crashed];
        let config = ExecutionConfig {
            bootstrap_iterations: 500,
            show_progress: false,
            ..Default::default()
        };

        let stats = compute_statistics(&results);
        let report = build_report(&results, &stats, &config, 12.0);

        assert_eq!(report.summary.total_benchmarks, 2);
        assert_eq!(report.summary.passed, 1);
        assert_eq!(report.summary.crashed, 1);
        assert!(report.has_crashes());

        let m = report.results[0].metrics.as_ref().unwrap();
        assert_eq!(m.samples, 50);
        assert_eq!(m.iterations, 1_000);
        assert!(m.ci_lower_ns <= m.mean_ns && m.mean_ns <= m.ci_upper_ns);
        assert_eq!(m.ci_level, 0.95);
        let rate = m.throughput.unwrap();
        assert_eq!(rate.unit, ThroughputUnit::Bytes);
        assert!((m.cycles_per_ns - 3.0).abs() < 0.05);

        assert!(report.results[1].metrics.is_none());
        assert_eq!(report.results[1].failure.as_ref().unwrap().message, "boom");
    }

    #[test]
    fn bootstrap_can_be_disabled() {
        let results = vec![result("g/a", vec![10.0, 11.0, 12.0, 13.0], BenchmarkStatus::Passed)];
        let config = ExecutionConfig {
            bootstrap_iterations: 0,
            show_progress: false,
            ..Default::default()
        };
        let report = build_report(&results, &compute_statistics(&results), &config, 0.0);
        let m = report.results[0].metrics.as_ref().unwrap();
        assert_eq!(m.ci_level, 0.0);
        assert_eq!(m.ci_lower_ns, m.mean_ns);
    }
}
