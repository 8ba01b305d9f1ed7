//! Summary statistics
//!
//! Mean, median and standard deviation describe the fenced samples; min, max
//! and percentiles describe all of them.

use crate::outliers::{OutlierMethod, OutlierReport, classify_outliers};
use crate::percentiles::{Percentiles, percentile, percentiles};
use crate::{mean, sorted};

/// Per-benchmark summary.
#[derive(Debug, Clone, Default)]
pub struct SummaryStatistics {
    /// Mean of fenced samples.
    pub mean: f64,
    /// Median of fenced samples.
    pub median: f64,
    /// Sample standard deviation of fenced samples.
    pub std_dev: f64,
    /// Smallest sample.
    pub min: f64,
    /// Largest sample.
    pub max: f64,
    /// Percentiles of all samples.
    pub percentiles: Percentiles,
    /// Number of samples.
    pub sample_count: usize,
    /// Outlier classification.
    pub outliers: OutlierReport,
}

impl SummaryStatistics {
    /// Standard deviation as a percentage of the mean.
    pub fn coefficient_of_variation(&self) -> f64 {
        if self.mean == 0.0 {
            0.0
        } else {
            self.std_dev / self.mean * 100.0
        }
    }
}

/// Summarise `samples`.
pub fn compute_summary(samples: &[f64], method: OutlierMethod) -> SummaryStatistics {
    if samples.is_empty() {
        return SummaryStatistics::default();
    }

    let outliers = classify_outliers(samples, method);
    let kept = &outliers.kept;
    let centre = mean(kept);
    let std_dev = if kept.len() < 2 {
        0.0
    } else {
        let ss: f64 = kept.iter().map(|x| (x - centre).powi(2)).sum();
        (ss / (kept.len() - 1) as f64).sqrt()
    };
    let all = sorted(samples);

    SummaryStatistics {
        mean: centre,
        median: percentile(kept, 50.0),
        std_dev,
        min: all[0],
        max: all[all.len() - 1],
        percentiles: percentiles(&all),
        sample_count: samples.len(),
        outliers,
    }
}

/// Cycle-count statistics for one benchmark.
#[derive(Debug, Clone, Copy, Default)]
pub struct CyclesStatistics {
    /// Mean ticks per iteration.
    pub mean_cycles: f64,
    /// Median ticks per iteration.
    pub median_cycles: f64,
    /// Ticks per nanosecond; approximates the counter frequency in GHz.
    pub cycles_per_ns: f64,
}

/// Summarise cycle counts against the matching nanosecond samples.
pub fn compute_cycles_stats(cycles: &[u64], nanos: &[f64]) -> CyclesStatistics {
    if cycles.is_empty() {
        return CyclesStatistics::default();
    }
    let as_f64: Vec<f64> = cycles.iter().map(|&c| c as f64).collect();
    let total_nanos: f64 = nanos.iter().sum();
    CyclesStatistics {
        mean_cycles: mean(&as_f64),
        median_cycles: percentile(&as_f64, 50.0),
        cycles_per_ns: if total_nanos > 0.0 {
            as_f64.iter().sum::<f64>() / total_nanos
        } else {
            0.0
        },
    }
}
