//! Statistics Computation
//!
//! Summary statistics for every result, computed in parallel. Mean, median
//! and standard deviation come from Tukey-fenced samples (k = 1.5); min, max
//! and percentiles from all of them.

use super::execution::BenchExecutionResult;
use benchgate_stats::{OutlierMethod, SummaryStatistics, compute_summary};
use rayon::prelude::*;

/// `(case id, statistics)` per result, in input order. `None` for results
/// without samples (crashed or failed cases).
pub fn compute_statistics(
    results: &[BenchExecutionResult],
) -> Vec<(String, Option<SummaryStatistics>)> {
    results
        .par_iter()
        .map(|r| {
            let stats = (!r.samples.is_empty())
                .then(|| compute_summary(&r.samples, OutlierMethod::default()));
            (r.benchmark_id.clone(), stats)
        })
        .collect()
}
