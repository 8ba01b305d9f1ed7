//! Benchmark Planner
//!
//! Selects the cases to run:
//! - regex match on the case id (`group/name`)
//! - exact group name
//!
//! Selected cases are sorted by id so runs are deterministic.

use benchgate_core::BenchmarkCase;
use regex::Regex;

/// Filter and order `cases`.
pub fn build_plan(
    cases: impl IntoIterator<Item = BenchmarkCase>,
    filter: Option<&Regex>,
    group: Option<&str>,
) -> Vec<BenchmarkCase> {
    let mut selected: Vec<_> = cases
        .into_iter()
        .filter(|case| filter.is_none_or(|re| re.is_match(&case.id)))
        .filter(|case| group.is_none_or(|g| case.group == g))
        .collect();

    selected.sort_by(|a, b| a.id.cmp(&b.id));
    selected
}
