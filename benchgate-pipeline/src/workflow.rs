//! Workflow definition
//!
//! A workflow is a set of jobs, each a list of steps bound to one runner
//! platform or a matrix of them. Workflows come from [`Workflow::standard`]
//! or a TOML file:
//!
//! ```toml
//! name = "CI"
//!
//! [triggers]
//! push = ["main"]
//! pull_request = true
//!
//! [env]
//! CARGO_TERM_COLOR = "always"
//!
//! [[jobs]]
//! id = "check"
//! name = "Check"
//! runs_on = "ubuntu-latest"
//!
//! [[jobs.steps]]
//! name = "Check formatting"
//! run = "cargo fmt --all -- --check"
//!
//! [[jobs]]
//! id = "bench"
//! name = "Bench"
//! needs = ["check"]
//! fail_fast = false
//! runs_on = { matrix = ["ubuntu-latest", "windows-latest"] }
//! ```

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Operating system family of a runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsFamily {
    /// Linux runners.
    Linux,
    /// Windows runners.
    Windows,
    /// macOS runners.
    MacOs,
    /// Anything we cannot classify.
    Unknown,
}

impl OsFamily {
    /// Family of the machine we are running on.
    pub fn host() -> Self {
        match std::env::consts::OS {
            "linux" => OsFamily::Linux,
            "windows" => OsFamily::Windows,
            "macos" => OsFamily::MacOs,
            _ => OsFamily::Unknown,
        }
    }

    /// The label hosted runners report for this family.
    pub fn label(&self) -> &'static str {
        match self {
            OsFamily::Linux => "Linux",
            OsFamily::Windows => "Windows",
            OsFamily::MacOs => "macOS",
            OsFamily::Unknown => "Unknown",
        }
    }
}

/// CPU architecture of a runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    /// 64-bit x86.
    X86_64,
    /// 64-bit ARM.
    Aarch64,
}

impl Arch {
    /// Architecture of the machine we are running on.
    pub fn host() -> Option<Self> {
        match std::env::consts::ARCH {
            "x86_64" => Some(Arch::X86_64),
            "aarch64" => Some(Arch::Aarch64),
            _ => None,
        }
    }
}

/// Runner identifier such as `ubuntu-latest` or `ubuntu-24.04-arm`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Platform(String);

impl Platform {
    /// Wrap a runner identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// OS family implied by the identifier.
    pub fn os(&self) -> OsFamily {
        let id = self.0.to_ascii_lowercase();
        if id.starts_with("ubuntu") || id.starts_with("linux") {
            OsFamily::Linux
        } else if id.starts_with("windows") {
            OsFamily::Windows
        } else if id.starts_with("macos") {
            OsFamily::MacOs
        } else {
            OsFamily::Unknown
        }
    }

    /// Architecture implied by the identifier.
    ///
    /// `-arm` suffixed images are ARM. Current `macos-*` images are Apple
    /// silicon except the `-13` and `-large`/`-intel` ones.
    pub fn arch(&self) -> Arch {
        let id = self.0.to_ascii_lowercase();
        let intel_mac = id.ends_with("-13") || id.contains("large") || id.contains("intel");
        if id.contains("arm") || id.contains("aarch64") || (id.starts_with("macos") && !intel_mac) {
            Arch::Aarch64
        } else {
            Arch::X86_64
        }
    }

    /// Whether this platform describes the current machine.
    pub fn matches_host(&self) -> bool {
        self.os() == OsFamily::host() && Arch::host() == Some(self.arch())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Platform {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Where a job runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RunsOn {
    /// A single runner.
    Fixed(Platform),
    /// One instance per listed runner.
    Matrix {
        /// Runner identifiers, one instance each.
        matrix: Vec<Platform>,
    },
}

impl RunsOn {
    /// Platforms this job expands to, in declaration order.
    pub fn platforms(&self) -> &[Platform] {
        match self {
            RunsOn::Fixed(p) => std::slice::from_ref(p),
            RunsOn::Matrix { matrix } => matrix,
        }
    }

    /// Whether the job is a matrix job.
    pub fn is_matrix(&self) -> bool {
        matches!(self, RunsOn::Matrix { .. })
    }
}

/// What a `run` step checks; decides how its failure is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Formatter in check mode.
    Format,
    /// Linter with warnings denied.
    Lint,
    /// Compile check.
    Compile,
    /// Benchmark run.
    Bench,
    /// Anything else.
    Other,
}

impl StepKind {
    /// Classify a command line by the cargo subcommand it invokes.
    pub fn infer(command: &str) -> Self {
        let mut words = command.split_whitespace();
        if words.next() != Some("cargo") {
            return StepKind::Other;
        }
        match words.find(|w| !w.starts_with('+') && !w.starts_with('-')) {
            Some("fmt") => StepKind::Format,
            Some("clippy") => StepKind::Lint,
            Some("check") | Some("build") => StepKind::Compile,
            Some("bench") => StepKind::Bench,
            _ => StepKind::Other,
        }
    }
}

/// Reference to a reusable action, `owner/name@version`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionRef {
    /// `owner/name`.
    pub name: String,
    /// Tag, branch or commit.
    pub version: String,
}

impl ActionRef {
    /// Build a reference.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Parse `owner/name@version`.
    pub fn parse(s: &str) -> Option<Self> {
        let (name, version) = s.split_once('@')?;
        if name.is_empty() || version.is_empty() {
            return None;
        }
        Some(Self::new(name, version))
    }
}

impl fmt::Display for ActionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// What a step does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    /// Invoke a reusable action with inputs.
    Uses {
        /// The action.
        action: ActionRef,
        /// Action inputs.
        with: BTreeMap<String, String>,
    },
    /// Run a shell command.
    Run {
        /// Command line.
        command: String,
        /// Failure classification.
        kind: StepKind,
    },
}

/// One step of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawStep", into = "RawStep")]
pub struct StepDef {
    /// Display name.
    pub name: String,
    /// Action or command.
    pub action: StepAction,
    /// Report failure as a warning and keep going.
    pub continue_on_error: bool,
}

impl StepDef {
    /// A `uses` step.
    pub fn uses(name: impl Into<String>, action: ActionRef) -> Self {
        Self {
            name: name.into(),
            action: StepAction::Uses {
                action,
                with: BTreeMap::new(),
            },
            continue_on_error: false,
        }
    }

    /// A `run` step; the kind is inferred from the command.
    pub fn run(name: impl Into<String>, command: impl Into<String>) -> Self {
        let command = command.into();
        let kind = StepKind::infer(&command);
        Self {
            name: name.into(),
            action: StepAction::Run { command, kind },
            continue_on_error: false,
        }
    }

    /// Add an action input. No effect on `run` steps.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let StepAction::Uses { with, .. } = &mut self.action {
            with.insert(key.into(), value.into());
        }
        self
    }

    /// Override the inferred kind. No effect on `uses` steps.
    pub fn kind(mut self, new_kind: StepKind) -> Self {
        if let StepAction::Run { kind, .. } = &mut self.action {
            *kind = new_kind;
        }
        self
    }

    /// The command line, for `run` steps.
    pub fn command(&self) -> Option<&str> {
        match &self.action {
            StepAction::Run { command, .. } => Some(command),
            StepAction::Uses { .. } => None,
        }
    }
}

/// Flat on-disk form of a step.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawStep {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    uses: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    run: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kind: Option<StepKind>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    continue_on_error: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    with: BTreeMap<String, String>,
}

impl TryFrom<RawStep> for StepDef {
    type Error = String;

    fn try_from(raw: RawStep) -> Result<Self, Self::Error> {
        let action = match (raw.uses, raw.run) {
            (Some(uses), None) => {
                let action = ActionRef::parse(&uses)
                    .ok_or_else(|| format!("`{uses}` is not of the form owner/name@version"))?;
                StepAction::Uses {
                    action,
                    with: raw.with,
                }
            }
            (None, Some(command)) => {
                let kind = raw.kind.unwrap_or_else(|| StepKind::infer(&command));
                StepAction::Run { command, kind }
            }
            (Some(_), Some(_)) => return Err("a step cannot have both `uses` and `run`".into()),
            (None, None) => return Err("a step needs either `uses` or `run`".into()),
        };
        let name = raw.name.unwrap_or_else(|| match &action {
            StepAction::Uses { action, .. } => action.to_string(),
            StepAction::Run { command, .. } => command.clone(),
        });
        Ok(StepDef {
            name,
            action,
            continue_on_error: raw.continue_on_error,
        })
    }
}

impl From<StepDef> for RawStep {
    fn from(step: StepDef) -> Self {
        let mut raw = RawStep {
            name: Some(step.name),
            uses: None,
            with: BTreeMap::new(),
            run: None,
            kind: None,
            continue_on_error: step.continue_on_error,
        };
        match step.action {
            StepAction::Uses { action, with } => {
                raw.uses = Some(action.to_string());
                raw.with = with;
            }
            StepAction::Run { command, kind } => {
                if StepKind::infer(&command) != kind {
                    raw.kind = Some(kind);
                }
                raw.run = Some(command);
            }
        }
        raw
    }
}

fn default_true() -> bool {
    true
}

/// One job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDef {
    /// Unique id, referenced by `needs`.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Jobs that must succeed first.
    #[serde(default)]
    pub needs: Vec<String>,
    /// Cancel sibling matrix instances after a failure.
    #[serde(default = "default_true")]
    pub fail_fast: bool,
    /// Per-step time limit in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_minutes: Option<u64>,
    /// Runner or matrix.
    pub runs_on: RunsOn,
    /// Steps, run in order.
    pub steps: Vec<StepDef>,
}

impl JobDef {
    /// A job with no needs and no steps yet.
    pub fn new(id: impl Into<String>, name: impl Into<String>, runs_on: RunsOn) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            runs_on,
            needs: Vec::new(),
            fail_fast: true,
            timeout_minutes: None,
            steps: Vec::new(),
        }
    }

    /// Add a dependency.
    pub fn needs(mut self, job: impl Into<String>) -> Self {
        self.needs.push(job.into());
        self
    }

    /// Set matrix fail-fast.
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Append a step.
    pub fn step(mut self, step: StepDef) -> Self {
        self.steps.push(step);
        self
    }

    /// Step time limit, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_minutes
            .map(|m| Duration::from_secs(m.saturating_mul(60)))
    }
}

/// Events that start the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Triggers {
    /// Branches whose pushes trigger a run; `*` matches any branch.
    #[serde(default)]
    pub push: Vec<String>,
    /// Whether every pull request triggers a run.
    #[serde(default)]
    pub pull_request: bool,
}

impl Triggers {
    /// Whether no event can ever trigger the workflow.
    pub fn is_empty(&self) -> bool {
        self.push.is_empty() && !self.pull_request
    }
}

/// A complete workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    /// Display name.
    pub name: String,
    /// Triggering events.
    #[serde(default)]
    pub triggers: Triggers,
    /// Environment for every step.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Jobs in declaration order.
    pub jobs: Vec<JobDef>,
}

/// Runner images the benchmark suite is measured on.
pub const BENCH_PLATFORMS: [&str; 4] = [
    "ubuntu-latest",
    "windows-latest",
    "macos-latest",
    "ubuntu-24.04-arm",
];

/// Cache key template used by the cache step, in hosted-runner syntax.
pub const CACHE_KEY_TEMPLATE: &str = "${{ matrix.os }}-cargo-${{ hashFiles('**/Cargo.lock') }}";

impl Workflow {
    /// The repository's CI workflow: a check job gating a benchmark job
    /// fanned out over [`BENCH_PLATFORMS`].
    pub fn standard() -> Self {
        let checkout = || StepDef::uses("Checkout", ActionRef::new("actions/checkout", "v4"));
        let toolchain = || {
            StepDef::uses(
                "Install toolchain",
                ActionRef::new("dtolnay/rust-toolchain", "stable"),
            )
        };

        let check = JobDef::new("check", "Check", RunsOn::Fixed("ubuntu-latest".into()))
            .step(checkout())
            .step(toolchain().with("components", "rustfmt, clippy"))
            .step(StepDef::run("Check formatting", "cargo fmt --all -- --check"))
            .step(StepDef::run(
                "Clippy",
                "cargo clippy --all-features --all-targets -- -D warnings",
            ))
            .step(StepDef::run("Check", "cargo check --all-features --all-targets"));

        let bench = JobDef::new(
            "bench",
            "Bench",
            RunsOn::Matrix {
                matrix: BENCH_PLATFORMS.iter().map(|&p| Platform::new(p)).collect(),
            },
        )
        .needs("check")
        .fail_fast(false)
        .step(checkout())
        .step(toolchain())
        .step(
            StepDef::uses("Cache cargo", ActionRef::new("actions/cache", "v4"))
                .with("path", "~/.cargo/registry\n~/.cargo/git\ntarget")
                .with("key", CACHE_KEY_TEMPLATE),
        )
        .step(StepDef::run("Run benchmarks", "cargo bench"));

        Workflow {
            name: "CI".to_string(),
            triggers: Triggers {
                push: vec!["main".to_string()],
                pull_request: true,
            },
            env: BTreeMap::from([("CARGO_TERM_COLOR".to_string(), "always".to_string())]),
            jobs: vec![check, bench],
        }
    }

    /// Parse a workflow from TOML.
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    /// Read and parse a workflow file.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let source = std::fs::read_to_string(path).map_err(|source| PipelineError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source).map_err(|source| PipelineError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Look up a job by id.
    pub fn job(&self, id: &str) -> Option<&JobDef> {
        self.jobs.iter().find(|j| j.id == id)
    }
}
