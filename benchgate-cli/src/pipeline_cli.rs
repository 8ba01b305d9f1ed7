//! The `benchgate` binary: validate, plan, run and render the CI workflow.
//!
//! Exit codes: 0 success (or an event that triggers nothing), 1 pipeline
//! failure or a stale rendered file, 2 invalid workflow or usage.

use crate::config::BenchgateConfig;
use crate::init_tracing;
use anyhow::{Context, anyhow};
use benchgate_pipeline::{
    BENCH_PLATFORMS, CommandRunner, ExecutorConfig, LocalCache, PipelineError, Platform,
    PlatformPolicy, TriggerEvent, Workflow, cache_key, job_graph, lockfile_digest, plan,
    run_workflow, validate,
};
use benchgate_report::{
    format_pipeline_human, format_plan, generate_pipeline_json, generate_pipeline_summary,
    render_github_workflow,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Where the rendered workflow lives.
pub const WORKFLOW_FILE: &str = ".github/workflows/ci.yml";

const EXIT_FAILED: i32 = 1;
const EXIT_INVALID: i32 = 2;

/// Pipeline runner arguments
#[derive(Parser, Debug)]
#[command(name = "benchgate")]
#[command(author, version, about = "Validate, plan, run and render the benchgate CI workflow")]
pub struct PipelineCli {
    /// Workflow TOML file (defaults to the built-in CI workflow)
    #[arg(long, global = true)]
    pub workflow: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// What to do
    #[command(subcommand)]
    pub command: PipelineCommand,
}

/// Pipeline subcommands
#[derive(Subcommand, Debug)]
pub enum PipelineCommand {
    /// Check the workflow and print its job graph
    Validate,
    /// Print the stages and job instances an event schedules
    Plan(EventArgs),
    /// Execute the workflow locally
    Run {
        /// Triggering event
        #[command(flatten)]
        event: EventArgs,
        /// Instances run at once per stage
        #[arg(long)]
        jobs: Option<usize>,
        /// Run every matrix platform on this machine
        #[arg(long)]
        all_platforms: bool,
        /// Output format: human, json, github
        #[arg(long, value_enum, default_value_t = RunFormat::Human)]
        format: RunFormat,
    },
    /// Print or write the GitHub Actions YAML
    Render {
        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Fail if the file (default .github/workflows/ci.yml) is out of date
        #[arg(long)]
        check: bool,
    },
    /// Print the dependency cache key for the workspace
    CacheKey {
        /// Runner platform (defaults to the bench platform matching this host)
        #[arg(long)]
        platform: Option<String>,
    },
}

/// Triggering event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EventKind {
    /// Push to a branch
    Push,
    /// Pull request
    #[value(name = "pull_request", alias = "pull-request")]
    PullRequest,
}

/// Event selection shared by `plan` and `run`.
#[derive(Args, Debug, Clone)]
pub struct EventArgs {
    /// Triggering event
    #[arg(long, value_enum, default_value_t = EventKind::Push)]
    pub event: EventKind,
    /// Branch pushed to
    #[arg(long, default_value = "main")]
    pub branch: String,
}

impl EventArgs {
    fn to_event(&self) -> TriggerEvent {
        match self.event {
            EventKind::Push => TriggerEvent::push(self.branch.clone()),
            EventKind::PullRequest => TriggerEvent::PullRequest,
        }
    }
}

/// Output of `run`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunFormat {
    /// Terminal text
    Human,
    /// JSON document
    Json,
    /// Markdown for $GITHUB_STEP_SUMMARY
    Github,
}

/// Parse the process arguments, run, and exit with the resulting code.
pub fn run_pipeline() -> ! {
    let cli = PipelineCli::parse();
    let code = match run_pipeline_cli(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            EXIT_INVALID
        }
    };
    std::process::exit(code)
}

/// Run a parsed command and return the process exit code.
///
/// Workflow problems are reported and mapped to exit code 2; other errors
/// are returned.
pub fn run_pipeline_cli(cli: PipelineCli) -> anyhow::Result<i32> {
    init_tracing(cli.verbose);
    let config = BenchgateConfig::discover()?.unwrap_or_default();

    let workflow = match load_workflow(cli.workflow.as_deref(), &config) {
        Ok(workflow) => workflow,
        Err(e) => {
            eprintln!("error: {e}");
            return Ok(EXIT_INVALID);
        }
    };

    match cli.command {
        PipelineCommand::Validate => Ok(validate_command(&workflow)),
        PipelineCommand::Plan(event) => plan_command(&workflow, &event.to_event()),
        PipelineCommand::Run {
            event,
            jobs,
            all_platforms,
            format,
        } => {
            let mut executor = executor_config(&config)?;
            executor.max_parallel = jobs.or(executor.max_parallel);
            if all_platforms {
                executor.policy = PlatformPolicy::Emulate;
            }
            let runner = CommandRunner::new(LocalCache::new(&config.pipeline.cache_dir));
            run_command(&workflow, &event.to_event(), runner, executor, format)
        }
        PipelineCommand::Render { output, check } => render_command(&workflow, output, check),
        PipelineCommand::CacheKey { platform } => {
            let root = std::env::current_dir()?;
            let platform = match platform {
                Some(id) => Platform::new(id),
                None => host_bench_platform()
                    .ok_or_else(|| anyhow!("no bench platform matches this host; pass --platform"))?,
            };
            println!("{}", workspace_cache_key(&root, &platform)?);
            Ok(0)
        }
    }
}

fn load_workflow(path: Option<&Path>, config: &BenchgateConfig) -> Result<Workflow, PipelineError> {
    let configured = config.pipeline.workflow.as_deref().map(Path::new);
    match path.or(configured) {
        Some(path) => {
            debug!(path = %path.display(), "loading workflow");
            Workflow::load(path)
        }
        None => Ok(Workflow::standard()),
    }
}

fn executor_config(config: &BenchgateConfig) -> anyhow::Result<ExecutorConfig> {
    let mut executor = ExecutorConfig::new(std::env::current_dir()?);
    executor.max_parallel = config.pipeline.jobs;
    executor.policy = config.pipeline.platform_policy;
    executor.default_timeout = config.pipeline.step_timeout()?;
    Ok(executor)
}

fn validate_command(workflow: &Workflow) -> i32 {
    if let Err(errors) = validate(workflow) {
        for error in errors.errors() {
            eprintln!("error: {error}");
        }
        return EXIT_INVALID;
    }
    println!("Workflow '{}' is valid.", workflow.name);
    let graph = job_graph(workflow);
    let edges = graph.edges();
    if edges.is_empty() {
        println!("No job dependencies.");
    }
    for (from, to) in edges {
        println!("  {from} -> {to}");
    }
    0
}

fn plan_command(workflow: &Workflow, event: &TriggerEvent) -> anyhow::Result<i32> {
    match plan(workflow, event) {
        Ok(Some(plan)) => {
            print!("{}", format_plan(&plan));
            Ok(0)
        }
        Ok(None) => {
            println!("{} is not triggered by {event}.", workflow.name);
            Ok(0)
        }
        Err(e) => invalid(e),
    }
}

fn run_command(
    workflow: &Workflow,
    event: &TriggerEvent,
    runner: CommandRunner,
    config: ExecutorConfig,
    format: RunFormat,
) -> anyhow::Result<i32> {
    let run = match run_workflow(workflow, event, runner, config) {
        Ok(run) => run,
        Err(e) => return invalid(e),
    };
    let output = match format {
        RunFormat::Human => format_pipeline_human(&run),
        RunFormat::Json => generate_pipeline_json(&run)?,
        RunFormat::Github => generate_pipeline_summary(&run),
    };
    print!("{output}");
    info!(status = ?run.status, "run finished");
    Ok(run.status.exit_code())
}

fn render_command(workflow: &Workflow, output: Option<PathBuf>, check: bool) -> anyhow::Result<i32> {
    if let Err(errors) = validate(workflow) {
        return invalid(PipelineError::Invalid(errors));
    }
    let yaml = render_github_workflow(workflow);

    if check {
        let path = output.unwrap_or_else(|| PathBuf::from(WORKFLOW_FILE));
        let current = std::fs::read_to_string(&path).unwrap_or_default();
        if current == yaml {
            println!("{} is up to date.", path.display());
            return Ok(0);
        }
        eprintln!(
            "{} is out of date; run `benchgate render --output {}`.",
            path.display(),
            path.display()
        );
        return Ok(EXIT_FAILED);
    }

    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(&path, yaml)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => print!("{yaml}"),
    }
    Ok(0)
}

fn invalid(error: PipelineError) -> anyhow::Result<i32> {
    match error {
        PipelineError::Invalid(errors) => {
            for error in errors.errors() {
                eprintln!("error: {error}");
            }
            Ok(EXIT_INVALID)
        }
        PipelineError::Graph(_) | PipelineError::Read { .. } | PipelineError::Parse { .. } => {
            eprintln!("error: {error}");
            Ok(EXIT_INVALID)
        }
        other => Err(other.into()),
    }
}

/// The bench platform this machine can stand in for.
fn host_bench_platform() -> Option<Platform> {
    BENCH_PLATFORMS
        .iter()
        .map(|&id| Platform::new(id))
        .find(Platform::matches_host)
}

/// Cache key for `platform` over the lockfiles under `root`.
fn workspace_cache_key(root: &Path, platform: &Platform) -> anyhow::Result<String> {
    let digest = lockfile_digest(root)?;
    Ok(cache_key(platform, &digest))
}
