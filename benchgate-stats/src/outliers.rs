//! Outlier classification with Tukey fences.
//!
//! Samples outside `[Q1 - k*IQR, Q3 + k*IQR]` are outliers. They are
//! excluded from the mean and standard deviation but kept for min, max and
//! percentiles.

use crate::percentiles::percentile_of_sorted;
use crate::sorted;

/// How outliers are detected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutlierMethod {
    /// Tukey fences with multiplier `k`.
    Iqr {
        /// IQR multiplier.
        k: f64,
    },
    /// Keep every sample.
    None,
}

impl Default for OutlierMethod {
    fn default() -> Self {
        OutlierMethod::Iqr { k: 1.5 }
    }
}

/// Classification of a sample set.
#[derive(Debug, Clone, Default)]
pub struct OutlierReport {
    /// Samples inside the fences, in input order.
    pub kept: Vec<f64>,
    /// Below the lower fence.
    pub low: usize,
    /// Above the upper fence.
    pub high: usize,
    /// Lower fence.
    pub lower_fence: f64,
    /// Upper fence.
    pub upper_fence: f64,
}

impl OutlierReport {
    /// Total outliers.
    pub fn count(&self) -> usize {
        self.low + self.high
    }

    /// Outliers as a percentage of all samples.
    pub fn percentage(&self) -> f64 {
        let total = self.kept.len() + self.count();
        if total == 0 {
            0.0
        } else {
            self.count() as f64 * 100.0 / total as f64
        }
    }
}

/// Classify `samples` with `method`.
pub fn classify_outliers(samples: &[f64], method: OutlierMethod) -> OutlierReport {
    let k = match method {
        OutlierMethod::Iqr { k } if !samples.is_empty() => k,
        _ => {
            return OutlierReport {
                kept: samples.to_vec(),
                lower_fence: f64::NEG_INFINITY,
                upper_fence: f64::INFINITY,
                ..OutlierReport::default()
            };
        }
    };

    let ordered = sorted(samples);
    let q1 = percentile_of_sorted(&ordered, 25.0);
    let q3 = percentile_of_sorted(&ordered, 75.0);
    let iqr = q3 - q1;
    let (lower_fence, upper_fence) = (q1 - k * iqr, q3 + k * iqr);

    let mut report = OutlierReport {
        kept: Vec::with_capacity(samples.len()),
        lower_fence,
        upper_fence,
        ..OutlierReport::default()
    };
    for &x in samples {
        if x < lower_fence {
            report.low += 1;
        } else if x > upper_fence {
            report.high += 1;
        } else {
            report.kept.push(x);
        }
    }
    report
}
