#![warn(missing_docs)]
//! benchgate Report - Reporting and Rendering
//!
//! Generates the output formats for benchmark reports and pipeline runs:
//! - JSON (machine-readable, also the baseline format)
//! - GitHub Summary (Markdown for $GITHUB_STEP_SUMMARY)
//! - CSV (spreadsheet-compatible)
//! - Human-readable terminal output
//!
//! and renders workflows as GitHub Actions YAML.

mod actions;
mod csv;
mod format;
mod github;
mod human;
mod json;
mod pipeline;
mod report;

pub use actions::render_github_workflow;
pub use csv::generate_csv_report;
pub use format::{format_duration, format_millis, format_throughput};
pub use github::{generate_github_summary, generate_pipeline_summary};
pub use human::format_human_output;
pub use json::{generate_json_report, generate_pipeline_json, parse_json_report};
pub use pipeline::{format_pipeline_human, format_plan};
pub use report::{
    BenchmarkMetrics, BenchmarkReportResult, BenchmarkStatus, Comparison, FailureInfo, Report,
    ReportConfig, ReportMeta, ReportSummary, SCHEMA_VERSION, SystemInfo, ThroughputRate,
    ThroughputUnit,
};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON with full schema
    Json,
    /// Markdown for GitHub Actions
    GithubSummary,
    /// CSV for spreadsheets
    Csv,
    /// Human-readable terminal output
    Human,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "github" | "github-summary" => Ok(OutputFormat::GithubSummary),
            "csv" => Ok(OutputFormat::Csv),
            "human" | "text" => Ok(OutputFormat::Human),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_names() {
        assert_eq!("json".parse(), Ok(OutputFormat::Json));
        assert_eq!("GitHub".parse(), Ok(OutputFormat::GithubSummary));
        assert_eq!("text".parse(), Ok(OutputFormat::Human));
        assert!("html".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn json_round_trip_keeps_baseline_fields() {
        let report = test_support::report_with(vec![test_support::result("quat/nlerp", 42.0)]);
        let json = generate_json_report(&report).unwrap();
        let back = parse_json_report(&json).unwrap();
        let metrics = back.results[0].metrics.as_ref().unwrap();
        assert_eq!(metrics.mean_ns, 42.0);
        assert_eq!(back.meta.schema_version, SCHEMA_VERSION);
        assert!(!json.contains("baseline_meta"));
    }
}
