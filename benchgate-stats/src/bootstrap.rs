//! Bootstrap confidence intervals for the mean.
//!
//! Resampling runs on the rayon pool. Samples below [`BCA_THRESHOLD`] use the
//! bias-corrected and accelerated interval; larger ones use plain percentiles.

use crate::percentiles::percentile_of_sorted;
use crate::{BCA_THRESHOLD, DEFAULT_BOOTSTRAP_ITERATIONS, DEFAULT_CONFIDENCE_LEVEL, mean, sorted};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use thiserror::Error;

/// Resampling settings.
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    /// Number of resamples.
    pub iterations: usize,
    /// Confidence level in (0, 1).
    pub confidence_level: f64,
    /// Fixed seed for reproducible intervals; random when `None`.
    pub seed: Option<u64>,
    /// Use BCa regardless of sample size.
    pub force_bca: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_BOOTSTRAP_ITERATIONS,
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            seed: None,
            force_bca: false,
        }
    }
}

/// Interval construction used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapMethod {
    /// Percentile interval.
    Percentile,
    /// Bias-corrected and accelerated interval.
    Bca,
}

/// Interval bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceInterval {
    /// Lower bound.
    pub lower: f64,
    /// Upper bound.
    pub upper: f64,
    /// Confidence level.
    pub level: f64,
}

impl ConfidenceInterval {
    /// Whether two intervals share any point.
    pub fn overlaps(&self, other: &ConfidenceInterval) -> bool {
        self.lower <= other.upper && other.lower <= self.upper
    }
}

/// Bootstrap output.
#[derive(Debug, Clone)]
pub struct BootstrapResult {
    /// Sample mean.
    pub point_estimate: f64,
    /// Interval around the mean.
    pub confidence_interval: ConfidenceInterval,
    /// Standard deviation of the resampled means.
    pub standard_error: f64,
    /// Interval construction used.
    pub method: BootstrapMethod,
}

/// Bootstrap failures.
#[derive(Debug, Error, PartialEq)]
pub enum BootstrapError {
    /// Fewer than three samples.
    #[error("not enough samples: got {got}, need at least {min}")]
    NotEnoughSamples {
        /// Samples provided.
        got: usize,
        /// Samples required.
        min: usize,
    },
    /// Level outside (0, 1).
    #[error("invalid confidence level {0}: must be between 0 and 1")]
    InvalidConfidenceLevel(f64),
}

/// Confidence interval for the mean of `samples`.
pub fn compute_bootstrap(
    samples: &[f64],
    config: &BootstrapConfig,
) -> Result<BootstrapResult, BootstrapError> {
    if samples.len() < 3 {
        return Err(BootstrapError::NotEnoughSamples {
            got: samples.len(),
            min: 3,
        });
    }
    let level = config.confidence_level;
    if !(level > 0.0 && level < 1.0) {
        return Err(BootstrapError::InvalidConfidenceLevel(level));
    }

    let estimate = mean(samples);
    if samples.iter().all(|&x| x == samples[0]) {
        return Ok(BootstrapResult {
            point_estimate: estimate,
            confidence_interval: ConfidenceInterval {
                lower: estimate,
                upper: estimate,
                level,
            },
            standard_error: 0.0,
            method: BootstrapMethod::Percentile,
        });
    }

    let means = sorted(&resample_means(samples, config.iterations.max(1), config.seed));
    let use_bca = config.force_bca || samples.len() < BCA_THRESHOLD;
    let alpha = (1.0 - level) / 2.0;

    let (lower, upper, method) = if use_bca {
        let (lo, hi) = bca_levels(samples, &means, estimate, alpha);
        (
            percentile_of_sorted(&means, lo * 100.0),
            percentile_of_sorted(&means, hi * 100.0),
            BootstrapMethod::Bca,
        )
    } else {
        (
            percentile_of_sorted(&means, alpha * 100.0),
            percentile_of_sorted(&means, (1.0 - alpha) * 100.0),
            BootstrapMethod::Percentile,
        )
    };

    let centre = mean(&means);
    let variance = means.iter().map(|m| (m - centre).powi(2)).sum::<f64>() / means.len() as f64;

    Ok(BootstrapResult {
        point_estimate: estimate,
        confidence_interval: ConfidenceInterval { lower, upper, level },
        standard_error: variance.sqrt(),
        method,
    })
}

fn resample_means(samples: &[f64], iterations: usize, seed: Option<u64>) -> Vec<f64> {
    let n = samples.len();
    let base = seed.unwrap_or_else(|| rand::thread_rng().r#gen());
    (0..iterations)
        .into_par_iter()
        .map_init(
            || StdRng::seed_from_u64(base ^ rayon::current_thread_index().unwrap_or(0) as u64),
            |rng, _| (0..n).map(|_| samples[rng.gen_range(0..n)]).sum::<f64>() / n as f64,
        )
        .collect()
}

/// Adjusted quantile levels for the BCa interval.
fn bca_levels(samples: &[f64], sorted_means: &[f64], estimate: f64, alpha: f64) -> (f64, f64) {
    let below = sorted_means.partition_point(|&m| m < estimate);
    let z0 = normal_quantile((below as f64 / sorted_means.len() as f64).clamp(1e-4, 1.0 - 1e-4));

    // Jackknife acceleration.
    let n = samples.len() as f64;
    let total: f64 = samples.iter().sum();
    let jack: Vec<f64> = samples.iter().map(|x| (total - x) / (n - 1.0)).collect();
    let jack_mean = mean(&jack);
    let num: f64 = jack.iter().map(|j| (jack_mean - j).powi(3)).sum();
    let den: f64 = jack.iter().map(|j| (jack_mean - j).powi(2)).sum();
    let a = if den.abs() < 1e-12 {
        0.0
    } else {
        num / (6.0 * den.powf(1.5))
    };

    let adjust = |z: f64| normal_cdf(z0 + (z0 + z) / (1.0 - a * (z0 + z)));
    (
        adjust(normal_quantile(alpha)),
        adjust(normal_quantile(1.0 - alpha)),
    )
}

/// Inverse standard normal CDF (Abramowitz and Stegun 26.2.23).
fn normal_quantile(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    let (sign, q) = if p < 0.5 { (-1.0, p) } else { (1.0, 1.0 - p) };
    let t = (-2.0 * q.ln()).sqrt();
    let num = 2.515517 + 0.802853 * t + 0.010328 * t * t;
    let den = 1.0 + 1.432788 * t + 0.189269 * t * t + 0.001308 * t * t * t;
    sign * (t - num / den)
}

/// Standard normal CDF via the Abramowitz and Stegun 7.1.26 erf.
fn normal_cdf(x: f64) -> f64 {
    let z = x / std::f64::consts::SQRT_2;
    let t = 1.0 / (1.0 + 0.3275911 * z.abs());
    let poly = ((((1.061405429 * t - 1.453152027) * t + 1.421413741) * t - 0.284496736) * t
        + 0.254829592)
        * t;
    let erf = 1.0 - poly * (-z * z).exp();
    0.5 * (1.0 + erf.copysign(z))
}
