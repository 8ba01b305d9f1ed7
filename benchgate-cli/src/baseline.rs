//! Baseline comparison
//!
//! A baseline is a JSON report saved by an earlier run. Each case present in
//! both reports gets a [`Comparison`]; the summary counts cases that moved
//! beyond the regression threshold in either direction.

use crate::config::BenchgateConfig;
use anyhow::Context;
use benchgate_report::{Comparison, Report, generate_json_report, parse_json_report};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Compare `report` against `baseline` with a threshold in percent.
///
/// A change is significant when it exceeds the threshold and the two
/// confidence intervals do not overlap.
pub fn apply_baseline_comparison(report: &mut Report, baseline: &Report, threshold: f64) {
    report.baseline_meta = Some(baseline.meta.clone());

    let baseline_map: HashMap<&str, _> = baseline
        .results
        .iter()
        .filter_map(|r| r.metrics.as_ref().map(|m| (r.id.as_str(), m)))
        .collect();

    for result in &mut report.results {
        let (Some(metrics), Some(base)) = (&result.metrics, baseline_map.get(result.id.as_str()))
        else {
            continue;
        };

        let absolute_change = metrics.mean_ns - base.mean_ns;
        let relative_change = if base.mean_ns > 0.0 {
            absolute_change / base.mean_ns * 100.0
        } else {
            0.0
        };

        let ci_non_overlap =
            metrics.ci_upper_ns < base.ci_lower_ns || metrics.ci_lower_ns > base.ci_upper_ns;
        let is_significant = relative_change.abs() > threshold && ci_non_overlap;

        let mut effect_size = if metrics.std_dev_ns > f64::EPSILON {
            absolute_change / metrics.std_dev_ns
        } else {
            0.0
        };
        if !effect_size.is_finite() {
            effect_size = 0.0;
        }

        let comparison = Comparison {
            baseline_mean_ns: base.mean_ns,
            absolute_change_ns: absolute_change,
            relative_change,
            threshold,
            is_significant,
            effect_size,
        };
        if comparison.is_regression() {
            report.summary.regressions += 1;
        } else if comparison.is_improvement() {
            report.summary.improvements += 1;
        }
        result.comparison = Some(comparison);
    }
}

/// Resolve the baseline path from a `--baseline`-style flag.
///
/// - `Some(Some(path))`: explicit path
/// - `Some(None)`: flag without a value, use the configured path
/// - `None`: flag not passed
pub fn resolve_baseline_path(
    flag: &Option<Option<PathBuf>>,
    config: &BenchgateConfig,
) -> Option<PathBuf> {
    match flag {
        Some(Some(path)) => Some(path.clone()),
        Some(None) => Some(config.output.baseline_file()),
        None => None,
    }
}

/// Read a baseline report.
pub fn load_baseline(path: &Path) -> anyhow::Result<Report> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read baseline {}", path.display()))?;
    parse_json_report(&json).with_context(|| format!("invalid baseline {}", path.display()))
}

/// Write `report` as a baseline, creating parent directories.
pub fn save_baseline(report: &Report, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, generate_json_report(report)?)
        .with_context(|| format!("failed to write baseline {}", path.display()))?;
    info!(path = %path.display(), "baseline saved");
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use benchgate_report::{
        BenchmarkMetrics, BenchmarkReportResult, BenchmarkStatus, ReportConfig, ReportMeta,
        ReportSummary, SCHEMA_VERSION, SystemInfo,
    };

    fn dummy_meta() -> ReportMeta {
        ReportMeta {
            schema_version: SCHEMA_VERSION,
            version: "0.1.0".to_string(),
            timestamp: chrono::Utc::now(),
            git_commit: None,
            git_branch: None,
            system: SystemInfo::default(),
            config: ReportConfig {
                warmup_time_ns: 0,
                measurement_time_ns: 0,
                min_iterations: None,
                max_iterations: None,
                bootstrap_iterations: 0,
                confidence_level: 0.95,
            },
        }
    }

    fn dummy_metrics(mean: f64) -> BenchmarkMetrics {
        BenchmarkMetrics {
            samples: 100,
            iterations: 10_000,
            mean_ns: mean,
            median_ns: mean,
            std_dev_ns: mean * 0.01,
            min_ns: mean * 0.9,
            max_ns: mean * 1.1,
            p50_ns: mean,
            p90_ns: mean * 1.05,
            p95_ns: mean * 1.07,
            p99_ns: mean * 1.09,
            p999_ns: mean * 1.1,
            outliers: 0,
            ci_lower_ns: mean * 0.98,
            ci_upper_ns: mean * 1.02,
            ci_level: 0.95,
            throughput: None,
            mean_cycles: 0.0,
            median_cycles: 0.0,
            cycles_per_ns: 0.0,
        }
    }

    pub(crate) fn dummy_result(id: &str, mean: f64) -> BenchmarkReportResult {
        BenchmarkReportResult {
            id: id.to_string(),
            name: id.to_string(),
            group: "test".to_string(),
            status: BenchmarkStatus::Passed,
            file: "test.rs".to_string(),
            line: 1,
            metrics: Some(dummy_metrics(mean)),
            comparison: None,
            failure: None,
        }
    }

    pub(crate) fn dummy_report(results: Vec<BenchmarkReportResult>) -> Report {
        let total = results.len();
        Report {
            meta: dummy_meta(),
            results,
            summary: ReportSummary {
                total_benchmarks: total,
                passed: total,
                ..Default::default()
            },
            baseline_meta: None,
        }
    }

    #[test]
    fn regression_beyond_threshold() {
        // 100ns -> 108ns is +8%
        let mut report = dummy_report(vec![dummy_result("lerp/f32", 108.0)]);
        let baseline = dummy_report(vec![dummy_result("lerp/f32", 100.0)]);

        apply_baseline_comparison(&mut report, &baseline, 5.0);

        assert_eq!(report.summary.regressions, 1);
        assert!(report.baseline_meta.is_some());
        let cmp = report.results[0].comparison.as_ref().unwrap();
        assert!((cmp.relative_change - 8.0).abs() < 1e-9);
        assert!(cmp.is_significant);
        assert_eq!(cmp.threshold, 5.0);
    }

    #[test]
    fn threshold_is_per_run() {
        let baseline = dummy_report(vec![dummy_result("lerp/f32", 100.0)]);

        let mut loose = dummy_report(vec![dummy_result("lerp/f32", 108.0)]);
        apply_baseline_comparison(&mut loose, &baseline, 25.0);
        assert_eq!(loose.summary.regressions, 0);
        assert!(!loose.results[0].comparison.as_ref().unwrap().is_significant);

        let mut tight = dummy_report(vec![dummy_result("lerp/f32", 108.0)]);
        apply_baseline_comparison(&mut tight, &baseline, 5.0);
        assert_eq!(tight.summary.regressions, 1);
    }

    #[test]
    fn overlapping_intervals_are_not_significant() {
        // +3% with +-2% intervals overlaps
        let mut report = dummy_report(vec![dummy_result("a", 103.0)]);
        let baseline = dummy_report(vec![dummy_result("a", 100.0)]);
        apply_baseline_comparison(&mut report, &baseline, 1.0);
        let cmp = report.results[0].comparison.as_ref().unwrap();
        assert!(!cmp.is_significant);
        assert_eq!(report.summary.regressions, 1);
    }

    #[test]
    fn improvement_and_new_cases() {
        let mut report = dummy_report(vec![dummy_result("old", 90.0), dummy_result("new", 50.0)]);
        let baseline = dummy_report(vec![dummy_result("old", 100.0)]);

        apply_baseline_comparison(&mut report, &baseline, 5.0);

        assert_eq!(report.summary.improvements, 1);
        assert_eq!(report.summary.regressions, 0);
        assert!(report.results[1].comparison.is_none());
    }

    #[test]
    fn baseline_path_resolution() {
        let config = BenchgateConfig::default();
        assert_eq!(resolve_baseline_path(&None, &config), None);
        assert_eq!(
            resolve_baseline_path(&Some(None), &config),
            Some(PathBuf::from("target/benchgate/baseline.json"))
        );
        assert_eq!(
            resolve_baseline_path(&Some(Some("b.json".into())), &config),
            Some(PathBuf::from("b.json"))
        );
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/baseline.json");
        let report = dummy_report(vec![dummy_result("a", 42.0)]);
        save_baseline(&report, &path).unwrap();
        let back = load_baseline(&path).unwrap();
        assert_eq!(back.results[0].metrics.as_ref().unwrap().mean_ns, 42.0);
        assert!(load_baseline(&dir.path().join("missing.json")).is_err());
    }
}
