//! Report Data Structures

use benchgate_core::Throughput;
use benchgate_stats::SummaryStatistics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current report schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete benchmark report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Run metadata
    pub meta: ReportMeta,
    /// Per-case results, ordered by id
    pub results: Vec<BenchmarkReportResult>,
    /// Totals
    pub summary: ReportSummary,
    /// Metadata of the baseline this run was compared with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_meta: Option<ReportMeta>,
}

impl Report {
    /// Whether any case panicked.
    pub fn has_crashes(&self) -> bool {
        self.results
            .iter()
            .any(|r| r.status == BenchmarkStatus::Crashed)
    }

    /// Look up a case by id.
    pub fn result(&self, id: &str) -> Option<&BenchmarkReportResult> {
        self.results.iter().find(|r| r.id == id)
    }
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    /// Schema version of this report
    pub schema_version: u32,
    /// Harness version
    pub version: String,
    /// Generation time
    pub timestamp: DateTime<Utc>,
    /// `git rev-parse HEAD`, when available
    pub git_commit: Option<String>,
    /// Current branch, when available
    pub git_branch: Option<String>,
    /// Host description
    pub system: SystemInfo,
    /// Measurement settings
    pub config: ReportConfig,
}

/// Execution configuration captured in report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Warmup per case
    pub warmup_time_ns: u64,
    /// Measurement budget per case
    pub measurement_time_ns: u64,
    /// Iteration floor
    pub min_iterations: Option<u64>,
    /// Iteration cap
    pub max_iterations: Option<u64>,
    /// Bootstrap resamples
    pub bootstrap_iterations: usize,
    /// Confidence level of the intervals
    pub confidence_level: f64,
}

/// System information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemInfo {
    /// Operating system name
    pub os: String,
    /// Operating system version
    pub os_version: String,
    /// Kernel version
    pub kernel_version: String,
    /// CPU architecture
    pub arch: String,
    /// CPU brand string
    pub cpu: String,
    /// Physical cores, falling back to logical cores
    pub cpu_cores: u32,
    /// Total memory
    pub memory_gb: f64,
}

/// Individual benchmark result in the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReportResult {
    /// `group/name`
    pub id: String,
    /// Case name
    pub name: String,
    /// Group name
    pub group: String,
    /// Outcome
    pub status: BenchmarkStatus,
    /// Registration file
    pub file: String,
    /// Registration line
    pub line: u32,
    /// Timing metrics; absent when the case did not produce samples
    pub metrics: Option<BenchmarkMetrics>,
    /// Change against the baseline
    pub comparison: Option<Comparison>,
    /// Why the case failed
    pub failure: Option<FailureInfo>,
}

/// Benchmark execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BenchmarkStatus {
    /// Measured
    Passed,
    /// Ran but produced no usable samples
    Failed,
    /// Panicked
    Crashed,
    /// Filtered out
    Skipped,
}

/// Unit a throughput rate is counted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThroughputUnit {
    /// Iterations
    Ops,
    /// Logical elements
    Elements,
    /// Bytes
    Bytes,
}

impl ThroughputUnit {
    /// Rate suffix.
    pub fn label(&self) -> &'static str {
        match self {
            ThroughputUnit::Ops => "ops/s",
            ThroughputUnit::Elements => "elem/s",
            ThroughputUnit::Bytes => "B/s",
        }
    }
}

/// Work done per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThroughputRate {
    /// Unit
    pub unit: ThroughputUnit,
    /// Units per second
    pub per_second: f64,
}

impl ThroughputRate {
    /// Rate for a mean iteration time. Cases without a declared throughput
    /// are counted in iterations.
    pub fn from_mean(throughput: Option<Throughput>, mean_ns: f64) -> Option<Self> {
        if mean_ns <= 0.0 {
            return None;
        }
        let (unit, per_second) = match throughput {
            Some(t @ Throughput::Elements(_)) => (ThroughputUnit::Elements, t.per_second(mean_ns)),
            Some(t @ Throughput::Bytes(_)) => (ThroughputUnit::Bytes, t.per_second(mean_ns)),
            None => (ThroughputUnit::Ops, 1e9 / mean_ns),
        };
        Some(Self { unit, per_second })
    }
}

/// Benchmark timing metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkMetrics {
    /// Sample count
    pub samples: usize,
    /// Measured iterations across all samples
    pub iterations: u64,
    /// Mean of fenced samples
    pub mean_ns: f64,
    /// Median of fenced samples
    pub median_ns: f64,
    /// Standard deviation of fenced samples
    pub std_dev_ns: f64,
    /// Fastest sample
    pub min_ns: f64,
    /// Slowest sample
    pub max_ns: f64,
    /// 50th percentile
    pub p50_ns: f64,
    /// 90th percentile
    pub p90_ns: f64,
    /// 95th percentile
    pub p95_ns: f64,
    /// 99th percentile
    pub p99_ns: f64,
    /// 99.9th percentile
    pub p999_ns: f64,
    /// Samples outside the fences
    pub outliers: usize,
    /// Lower confidence bound of the mean
    pub ci_lower_ns: f64,
    /// Upper confidence bound of the mean
    pub ci_upper_ns: f64,
    /// Confidence level of the bounds
    pub ci_level: f64,
    /// Work rate at the mean
    pub throughput: Option<ThroughputRate>,
    /// Mean cycles per iteration; zero without a cycle counter
    pub mean_cycles: f64,
    /// Median cycles per iteration
    pub median_cycles: f64,
    /// Cycle counter frequency in GHz
    pub cycles_per_ns: f64,
}

impl From<&SummaryStatistics> for BenchmarkMetrics {
    fn from(stats: &SummaryStatistics) -> Self {
        Self {
            samples: stats.sample_count,
            iterations: 0,
            mean_ns: stats.mean,
            median_ns: stats.median,
            std_dev_ns: stats.std_dev,
            min_ns: stats.min,
            max_ns: stats.max,
            p50_ns: stats.percentiles.p50,
            p90_ns: stats.percentiles.p90,
            p95_ns: stats.percentiles.p95,
            p99_ns: stats.percentiles.p99,
            p999_ns: stats.percentiles.p999,
            outliers: stats.outliers.count(),
            // filled by bootstrap
            ci_lower_ns: stats.mean,
            ci_upper_ns: stats.mean,
            ci_level: 0.0,
            throughput: None,
            mean_cycles: 0.0,
            median_cycles: 0.0,
            cycles_per_ns: 0.0,
        }
    }
}

/// Comparison against baseline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comparison {
    /// Baseline mean
    pub baseline_mean_ns: f64,
    /// Current minus baseline
    pub absolute_change_ns: f64,
    /// Change in percent of the baseline mean; positive is slower
    pub relative_change: f64,
    /// Threshold the change was judged against, in percent
    pub threshold: f64,
    /// Change beyond threshold with non-overlapping intervals
    pub is_significant: bool,
    /// Change in units of the current standard deviation
    pub effect_size: f64,
}

impl Comparison {
    /// Slower than the threshold allows.
    pub fn is_regression(&self) -> bool {
        self.relative_change > self.threshold
    }

    /// Faster by more than the threshold.
    pub fn is_improvement(&self) -> bool {
        self.relative_change < -self.threshold
    }
}

/// Failure information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureInfo {
    /// `panic` or `no_samples`
    pub kind: String,
    /// Panic payload or explanation
    pub message: String,
}

/// Report summary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Cases in the report
    pub total_benchmarks: usize,
    /// Measured cases
    pub passed: usize,
    /// Cases without samples
    pub failed: usize,
    /// Panicked cases
    pub crashed: usize,
    /// Filtered cases
    pub skipped: usize,
    /// Slower than the threshold
    pub regressions: usize,
    /// Faster than the threshold
    pub improvements: usize,
    /// Wall-clock time of the run
    pub total_duration_ms: f64,
}
