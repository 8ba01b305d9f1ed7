//! JSON Output

use crate::report::Report;
use benchgate_pipeline::PipelineRun;

/// Generate a prettified JSON report.
///
/// The same document is read back as a baseline by later runs.
pub fn generate_json_report(report: &Report) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

/// Parse a report previously written by [`generate_json_report`].
pub fn parse_json_report(json: &str) -> Result<Report, serde_json::Error> {
    serde_json::from_str(json)
}

/// Generate a prettified JSON document for a pipeline run.
pub fn generate_pipeline_json(run: &PipelineRun) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(run)
}
