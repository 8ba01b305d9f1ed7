#![warn(missing_docs)]
//! benchgate statistics
//!
//! - Linear-interpolation percentiles over all samples
//! - Tukey fences for outlier classification
//! - Summary statistics where the centre comes from fenced data and the
//!   tails come from everything
//! - Bootstrap confidence intervals (BCa for small samples)

mod bootstrap;
mod outliers;
mod percentiles;
mod summary;

pub use bootstrap::{
    BootstrapConfig, BootstrapError, BootstrapMethod, BootstrapResult, ConfidenceInterval,
    compute_bootstrap,
};
pub use outliers::{OutlierMethod, OutlierReport, classify_outliers};
pub use percentiles::{Percentiles, percentile, percentiles};
pub use summary::{CyclesStatistics, SummaryStatistics, compute_cycles_stats, compute_summary};

/// Below this many samples the BCa interval is used.
pub const BCA_THRESHOLD: usize = 100;

/// Default bootstrap resample count.
pub const DEFAULT_BOOTSTRAP_ITERATIONS: usize = 10_000;

/// Default confidence level.
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

pub(crate) fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(f64::total_cmp);
    out
}
