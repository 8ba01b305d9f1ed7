//! Number formatting shared by the text outputs.

use crate::report::ThroughputRate;

/// Format nanoseconds with a unit that keeps three significant digits.
pub fn format_duration(ns: f64) -> String {
    let abs = ns.abs();
    if abs < 1_000.0 {
        format!("{ns:.2} ns")
    } else if abs < 1_000_000.0 {
        format!("{:.2} µs", ns / 1_000.0)
    } else if abs < 1_000_000_000.0 {
        format!("{:.2} ms", ns / 1_000_000.0)
    } else {
        format!("{:.2} s", ns / 1_000_000_000.0)
    }
}

/// Format a throughput rate with an SI prefix.
pub fn format_throughput(rate: &ThroughputRate) -> String {
    let value = rate.per_second;
    let (scaled, prefix) = if value >= 1e9 {
        (value / 1e9, "G")
    } else if value >= 1e6 {
        (value / 1e6, "M")
    } else if value >= 1e3 {
        (value / 1e3, "K")
    } else {
        (value, "")
    };
    format!("{scaled:.2} {prefix}{}", rate.unit.label())
}

/// Milliseconds as `1.2s` or `340ms`.
pub fn format_millis(ms: u64) -> String {
    if ms >= 1_000 {
        format!("{:.1}s", ms as f64 / 1_000.0)
    } else {
        format!("{ms}ms")
    }
}
