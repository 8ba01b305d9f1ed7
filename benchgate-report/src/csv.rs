//! CSV Output

use crate::report::Report;
use std::fmt::Write;

const HEADER: &str = "id,group,name,status,samples,mean_ns,median_ns,std_dev_ns,min_ns,max_ns,\
p50_ns,p90_ns,p95_ns,p99_ns,p999_ns,ci_lower_ns,ci_upper_ns,throughput_per_sec,throughput_unit,\
relative_change";

/// Generate a CSV report, one row per case.
///
/// Cases without metrics leave the numeric columns empty.
pub fn generate_csv_report(report: &Report) -> String {
    let mut out = String::new();
    out.push_str(HEADER);
    out.push('\n');

    for result in &report.results {
        let _ = write!(
            out,
            "{},{},{},{:?}",
            field(&result.id),
            field(&result.group),
            field(&result.name),
            result.status
        );
        match &result.metrics {
            Some(m) => {
                let _ = write!(
                    out,
                    ",{},{:.3},{:.3},{:.3},{:.3},{:.3},{:.3},{:.3},{:.3},{:.3},{:.3},{:.3},{:.3}",
                    m.samples,
                    m.mean_ns,
                    m.median_ns,
                    m.std_dev_ns,
                    m.min_ns,
                    m.max_ns,
                    m.p50_ns,
                    m.p90_ns,
                    m.p95_ns,
                    m.p99_ns,
                    m.p999_ns,
                    m.ci_lower_ns,
                    m.ci_upper_ns,
                );
                match &m.throughput {
                    Some(t) => {
                        let _ = write!(out, ",{:.3},{}", t.per_second, t.unit.label());
                    }
                    None => out.push_str(",,"),
                }
            }
            None => out.push_str(&",".repeat(15)),
        }
        match &result.comparison {
            Some(c) => {
                let _ = write!(out, ",{:.3}", c.relative_change);
            }
            None => out.push(','),
        }
        out.push('\n');
    }
    out
}

/// Quote a field when it contains a separator, quote or line break.
fn field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
