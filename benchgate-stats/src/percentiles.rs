//! Percentiles
//!
//! Always computed over the raw samples. The tail is where regressions in
//! latency show up first, so nothing is fenced off here.

use crate::sorted;

/// The percentiles reported per benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Percentiles {
    /// 50th.
    pub p50: f64,
    /// 90th.
    pub p90: f64,
    /// 95th.
    pub p95: f64,
    /// 99th.
    pub p99: f64,
    /// 99.9th.
    pub p999: f64,
}

/// `p`-th percentile (0..=100) with linear interpolation between ranks.
pub fn percentile(samples: &[f64], p: f64) -> f64 {
    match samples.len() {
        0 => 0.0,
        1 => samples[0],
        _ => percentile_of_sorted(&sorted(samples), p),
    }
}

pub(crate) fn percentile_of_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let last = sorted.len() - 1;
    let rank = (p.clamp(0.0, 100.0) / 100.0) * last as f64;
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(last);
    sorted[lo] + (rank - lo as f64) * (sorted[hi] - sorted[lo])
}

/// All reported percentiles at once (sorts once).
pub fn percentiles(samples: &[f64]) -> Percentiles {
    let sorted = sorted(samples);
    let at = |p| percentile_of_sorted(&sorted, p);
    Percentiles {
        p50: at(50.0),
        p90: at(90.0),
        p95: at(95.0),
        p99: at(99.0),
        p999: at(99.9),
    }
}
