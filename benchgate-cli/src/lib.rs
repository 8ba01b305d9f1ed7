#![warn(missing_docs)]
//! benchgate CLI Library
//!
//! Two entry points share this crate:
//!
//! - [`run`]: the harness behind every bench target. It discovers the groups
//!   registered with `bench_group!`, measures them, and prints or writes a
//!   report, optionally against a saved baseline.
//! - [`run_pipeline`]: the `benchgate` binary, which validates, plans,
//!   executes and renders the CI workflow locally.
//!
//! # Example
//!
//! ```ignore
//! use benchgate::prelude::*;
//!
//! fn copy(group: &mut BenchmarkGroup) {
//!     group.bench_function("copy", |b| b.iter(|| expensive_operation()));
//! }
//! bench_group!("memory", copy);
//!
//! fn main() {
//!     if let Err(e) = benchgate::run() {
//!         eprintln!("Error: {e}");
//!         std::process::exit(1);
//!     }
//! }
//! ```

mod baseline;
mod config;
mod executor;
mod pipeline_cli;
mod planner;

pub use baseline::{apply_baseline_comparison, load_baseline, resolve_baseline_path, save_baseline};
pub use config::*;
pub use executor::{
    BenchExecutionResult, ExecutionConfig, Executor, build_report, build_report_meta,
    compute_statistics, system_info,
};
pub use pipeline_cli::{
    EventArgs, EventKind, PipelineCli, PipelineCommand, RunFormat, WORKFLOW_FILE, run_pipeline,
    run_pipeline_cli,
};
pub use planner::build_plan;

use anyhow::Context;
use benchgate_core::{BenchmarkCase, DEFAULT_SAMPLE_COUNT, registered_cases};
use benchgate_report::{
    BenchmarkStatus, OutputFormat, Report, format_duration, format_human_output,
    generate_csv_report, generate_github_summary, generate_json_report,
};
use clap::Parser;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Bench harness arguments
#[derive(Parser, Debug)]
#[command(name = "benchgate")]
#[command(author, version, about = "benchgate - benchmark harness")]
pub struct Cli {
    /// Filter cases by regex on `group/name`
    #[arg(default_value = ".*")]
    pub filter: String,

    /// Run cases of this group only
    #[arg(long)]
    pub group: Option<String>,

    /// List the selected cases without running them
    #[arg(long, visible_alias = "dry-run")]
    pub list: bool,

    /// Output format: human, json, csv, github
    #[arg(long)]
    pub format: Option<String>,

    /// Output file (stdout if not specified)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Compare against a baseline report.
    /// Optionally specify a path; defaults to config or target/benchgate/baseline.json
    #[arg(long)]
    pub baseline: Option<Option<PathBuf>>,

    /// Save this run as the baseline.
    /// Optionally specify a path; defaults to config or target/benchgate/baseline.json
    #[arg(long)]
    pub save_baseline: Option<Option<PathBuf>>,

    /// Regression threshold percentage
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Warmup time per case (e.g. "1s", "500ms")
    #[arg(long)]
    pub warmup: Option<String>,

    /// Measurement time per case (e.g. "5s")
    #[arg(long)]
    pub measurement: Option<String>,

    /// Samples per case
    #[arg(long, short = 'n')]
    pub samples: Option<usize>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Internal: Absorb cargo bench's --bench flag
    #[arg(long, hide = true)]
    pub bench: bool,
}

/// Run the harness with the process arguments.
/// This is the main entry point for bench targets.
pub fn run() -> anyhow::Result<()> {
    run_with_cli(Cli::parse())
}

/// Run the harness with pre-parsed arguments.
///
/// Exits the process with status 1 when a case crashed, or when a baseline
/// comparison found regressions.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    init_tracing(cli.verbose);

    let config = BenchgateConfig::discover()?.unwrap_or_default();
    let format: OutputFormat = cli
        .format
        .as_deref()
        .unwrap_or(&config.output.format)
        .parse()
        .map_err(anyhow::Error::msg)?;
    let filter =
        Regex::new(&cli.filter).with_context(|| format!("invalid filter {:?}", cli.filter))?;

    let cases = build_plan(registered_cases(), Some(&filter), cli.group.as_deref());

    if cli.list {
        print!("{}", format_case_list(&cases));
        return Ok(());
    }

    if let Some(reason) = run_benchmarks(&cli, &config, format, cases)? {
        eprintln!("\n{reason}");
        std::process::exit(1);
    }
    Ok(())
}

/// Install the fmt subscriber. `RUST_LOG` wins over the verbosity flag.
pub(crate) fn init_tracing(verbose: bool) {
    let default = if verbose {
        "benchgate=debug"
    } else {
        "benchgate=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // a second call in the same process keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn format_case_list(cases: &[BenchmarkCase]) -> String {
    let mut groups: BTreeMap<&str, Vec<&BenchmarkCase>> = BTreeMap::new();
    for case in cases {
        groups.entry(&case.group).or_default().push(case);
    }

    let mut out = String::from("benchgate plan:\n");
    for (group, cases) in &groups {
        out.push_str(&format!("├── group: {group}\n"));
        for case in cases {
            out.push_str(&format!("│   ├── {} ({}:{})\n", case.id, case.file, case.line));
        }
    }
    out.push_str(&format!("{} benchmarks found.\n", cases.len()));
    out
}

/// Build an ExecutionConfig by layering: benchgate.toml, then CLI overrides.
fn build_execution_config(cli: &Cli, config: &BenchgateConfig) -> Result<ExecutionConfig, ConfigError> {
    let runner = &config.runner;
    let warmup = cli.warmup.as_deref().unwrap_or(&runner.warmup_time);
    let measurement = cli.measurement.as_deref().unwrap_or(&runner.measurement_time);

    Ok(ExecutionConfig {
        warmup_time_ns: BenchgateConfig::parse_duration(warmup)?,
        measurement_time_ns: BenchgateConfig::parse_duration(measurement)?,
        samples: cli.samples.or(runner.samples).unwrap_or(DEFAULT_SAMPLE_COUNT),
        min_iterations: runner.min_iterations,
        max_iterations: runner.max_iterations,
        bootstrap_iterations: runner.bootstrap_iterations,
        confidence_level: runner.confidence_level,
        show_progress: true,
    })
}

/// Measure `cases`, emit the report, and return why the run should fail.
fn run_benchmarks(
    cli: &Cli,
    config: &BenchgateConfig,
    format: OutputFormat,
    mut cases: Vec<BenchmarkCase>,
) -> anyhow::Result<Option<String>> {
    if cases.is_empty() {
        println!("No benchmarks found.");
        return Ok(None);
    }

    let exec_config = build_execution_config(cli, config)?;
    if (1..100).contains(&exec_config.bootstrap_iterations) {
        warn!(
            iterations = exec_config.bootstrap_iterations,
            "bootstrap_iterations is very low; confidence intervals will be unreliable"
        );
    }
    info!(cases = cases.len(), samples = exec_config.samples, "running benchmarks");

    let start = Instant::now();
    let results = Executor::new(exec_config.clone()).execute(&mut cases);
    let stats = compute_statistics(&results);
    let total_duration_ms = start.elapsed().as_secs_f64() * 1000.0;
    let mut report = build_report(&results, &stats, &exec_config, total_duration_ms);

    let threshold = cli.threshold.unwrap_or(config.ci.regression_threshold);
    let mut comparing = false;
    if let Some(path) = resolve_baseline_path(&cli.baseline, config) {
        if path.exists() {
            match load_baseline(&path) {
                Ok(baseline) => {
                    apply_baseline_comparison(&mut report, &baseline, threshold);
                    comparing = true;
                }
                Err(e) => warn!("{e:#}"),
            }
        } else {
            warn!(path = %path.display(), "baseline file not found");
        }
    }

    if config.ci.github_annotations {
        print!("{}", github_annotations(&report));
    }

    let output = match format {
        OutputFormat::Json => generate_json_report(&report)?,
        OutputFormat::GithubSummary => generate_github_summary(&report),
        OutputFormat::Csv => generate_csv_report(&report),
        OutputFormat::Human => format_human_output(&report),
    };
    if let Some(path) = &cli.output {
        std::fs::write(path, output)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Report written to: {}", path.display());
    } else {
        print!("{output}");
    }

    if cli.save_baseline.is_some() || config.output.save_baseline {
        let path = resolve_baseline_path(&cli.save_baseline, config)
            .unwrap_or_else(|| config.output.baseline_file());
        save_baseline(&report, &path)?;
        eprintln!("Baseline saved to: {}", path.display());
    }

    Ok(failure_reason(&report, comparing, threshold))
}

/// Why a finished run should exit non-zero, if it should.
fn failure_reason(report: &Report, comparing: bool, threshold: f64) -> Option<String> {
    let mut reasons = Vec::new();
    if report.summary.crashed > 0 {
        reasons.push(format!(
            "{} benchmark(s) crashed during execution",
            report.summary.crashed
        ));
    }
    if comparing && report.summary.regressions > 0 {
        reasons.push(format!(
            "{} regression(s) detected above {}% threshold",
            report.summary.regressions, threshold
        ));
    }
    (!reasons.is_empty()).then(|| reasons.join("\n"))
}

/// `::error` workflow commands for crashed or failed cases and significant
/// regressions, shown inline on pull requests.
fn github_annotations(report: &Report) -> String {
    let mut out = String::new();
    for result in &report.results {
        let fallback = match result.status {
            BenchmarkStatus::Crashed => Some("benchmark crashed"),
            BenchmarkStatus::Failed => Some("benchmark failed"),
            _ => None,
        };
        if let Some(fallback) = fallback {
            let msg = result
                .failure
                .as_ref()
                .map(|f| f.message.as_str())
                .unwrap_or(fallback);
            out.push_str(&format!(
                "::error file={},line={}::{}: {}\n",
                result.file, result.line, result.id, msg
            ));
        }

        if let Some(cmp) = &result.comparison {
            if cmp.is_significant && cmp.relative_change > 0.0 {
                out.push_str(&format!(
                    "::error file={},line={}::{}: regression {:+.1}% ({} → {})\n",
                    result.file,
                    result.line,
                    result.id,
                    cmp.relative_change,
                    format_duration(cmp.baseline_mean_ns),
                    format_duration(cmp.baseline_mean_ns + cmp.absolute_change_ns),
                ));
            }
        }
    }
    out
}
