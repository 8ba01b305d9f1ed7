//! Configuration loading from benchgate.toml
//!
//! Both the bench harness and the pipeline runner read `benchgate.toml`,
//! discovered by walking up from the current directory. Every field has a
//! default, so a missing file or a partial one is fine. Command-line flags
//! override whatever the file says.

use benchgate_pipeline::PlatformPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// File name looked for during discovery.
pub const CONFIG_FILE: &str = "benchgate.toml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid configuration TOML.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: toml::de::Error,
    },
    /// A duration string could not be understood.
    #[error("invalid duration {0:?}: {1}")]
    Duration(String, &'static str),
}

/// benchgate configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BenchgateConfig {
    /// Measurement settings
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Report output
    #[serde(default)]
    pub output: OutputConfig,
    /// CI behaviour of the harness
    #[serde(default)]
    pub ci: CiConfig,
    /// Local pipeline runs
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// `[runner]`: how long and how often each case is measured
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Time spent warming up before sampling
    #[serde(default = "default_warmup")]
    pub warmup_time: String,
    /// Time spent sampling
    #[serde(default = "default_measurement")]
    pub measurement_time: String,
    /// Samples per case when the group does not set one
    #[serde(default)]
    pub samples: Option<usize>,
    /// Minimum number of measured iterations
    #[serde(default)]
    pub min_iterations: Option<u64>,
    /// Maximum number of measured iterations
    #[serde(default)]
    pub max_iterations: Option<u64>,
    /// Bootstrap resamples; 0 skips the confidence interval
    #[serde(default = "default_bootstrap_iterations")]
    pub bootstrap_iterations: usize,
    /// Width of the confidence interval, in (0, 1)
    #[serde(default = "default_confidence_level")]
    pub confidence_level: f64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            warmup_time: default_warmup(),
            measurement_time: default_measurement(),
            samples: None,
            min_iterations: None,
            max_iterations: None,
            bootstrap_iterations: default_bootstrap_iterations(),
            confidence_level: default_confidence_level(),
        }
    }
}

fn default_warmup() -> String {
    "3s".to_string()
}
fn default_measurement() -> String {
    "5s".to_string()
}
fn default_bootstrap_iterations() -> usize {
    benchgate_stats::DEFAULT_BOOTSTRAP_ITERATIONS
}
fn default_confidence_level() -> f64 {
    benchgate_stats::DEFAULT_CONFIDENCE_LEVEL
}

/// `[output]`: where results go
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// One of human, json, github, csv
    #[serde(default = "default_format")]
    pub format: String,
    /// Report and baseline directory
    #[serde(default = "default_output_dir")]
    pub directory: String,
    /// Save a JSON baseline after each run
    #[serde(default)]
    pub save_baseline: bool,
    /// Explicit baseline location
    #[serde(default)]
    pub baseline_path: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            directory: default_output_dir(),
            save_baseline: false,
            baseline_path: None,
        }
    }
}

fn default_format() -> String {
    "human".to_string()
}
fn default_output_dir() -> String {
    "target/benchgate".to_string()
}

impl OutputConfig {
    /// Baseline location: the configured path, else `baseline.json` in the
    /// output directory.
    pub fn baseline_file(&self) -> PathBuf {
        self.baseline_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| Path::new(&self.directory).join("baseline.json"))
    }
}

/// `[ci]`: how results affect the exit code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CiConfig {
    /// Slowdown in percent that counts as a regression
    #[serde(default = "default_threshold")]
    pub regression_threshold: f64,
    /// Emit GitHub Actions annotations
    #[serde(default)]
    pub github_annotations: bool,
}

impl Default for CiConfig {
    fn default() -> Self {
        Self {
            regression_threshold: default_threshold(),
            github_annotations: false,
        }
    }
}

fn default_threshold() -> f64 {
    5.0
}

/// `[pipeline]`: local workflow runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Workflow TOML file; the built-in CI workflow when unset
    #[serde(default)]
    pub workflow: Option<String>,
    /// Instances run at once within a stage
    #[serde(default)]
    pub jobs: Option<usize>,
    /// Step time limit for jobs that declare none (e.g., "30m")
    #[serde(default)]
    pub step_timeout: Option<String>,
    /// "host-only" or "emulate"
    #[serde(default)]
    pub platform_policy: PlatformPolicy,
    /// Directory for dependency cache markers
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workflow: None,
            jobs: None,
            step_timeout: None,
            platform_policy: PlatformPolicy::default(),
            cache_dir: default_cache_dir(),
        }
    }
}

fn default_cache_dir() -> String {
    "target/benchgate/cache".to_string()
}

impl PipelineConfig {
    /// Parsed `step_timeout`.
    pub fn step_timeout(&self) -> Result<Option<Duration>, ConfigError> {
        self.step_timeout
            .as_deref()
            .map(|s| BenchgateConfig::parse_duration(s).map(Duration::from_nanos))
            .transpose()
    }
}

impl BenchgateConfig {
    /// Read and parse one file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Find `benchgate.toml` in `start` or one of its ancestors.
    pub fn find(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }

    /// Discover and load configuration by walking up from the current
    /// directory. `Ok(None)` when there is no file.
    pub fn discover() -> Result<Option<Self>, ConfigError> {
        let Ok(cwd) = std::env::current_dir() else {
            return Ok(None);
        };
        Self::find(&cwd).map(Self::load).transpose()
    }

    /// Nanoseconds in `"3s"`, `"500ms"`, `"2m"` and the like. A bare number
    /// means seconds.
    pub fn parse_duration(text: &str) -> Result<u64, ConfigError> {
        let trimmed = text.trim();
        let bad = |why| ConfigError::Duration(trimmed.to_string(), why);
        if trimmed.is_empty() {
            return Err(bad("empty"));
        }

        let split = trimmed
            .find(|c: char| c.is_alphabetic() || c == 'µ')
            .unwrap_or(trimmed.len());
        let (number, unit) = trimmed.split_at(split);

        let amount: f64 = number.trim().parse().map_err(|_| bad("not a number"))?;
        if !amount.is_finite() || amount < 0.0 {
            return Err(bad("must be non-negative"));
        }

        let scale = match unit.to_ascii_lowercase().as_str() {
            "ns" => 1e0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "" | "s" => 1e9,
            "m" | "min" => 60e9,
            _ => return Err(bad("unknown unit")),
        };
        Ok((amount * scale) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_a_file() {
        let config = BenchgateConfig::default();
        assert_eq!(config.runner.warmup_time, "3s");
        assert_eq!(config.runner.measurement_time, "5s");
        assert_eq!(config.ci.regression_threshold, 5.0);
        assert_eq!(config.pipeline.platform_policy, PlatformPolicy::HostOnly);
        assert_eq!(
            config.output.baseline_file(),
            PathBuf::from("target/benchgate/baseline.json")
        );
    }

    #[test]
    fn durations_accept_every_unit() {
        assert_eq!(BenchgateConfig::parse_duration("3s").unwrap(), 3_000_000_000);
        assert_eq!(BenchgateConfig::parse_duration("500ms").unwrap(), 500_000_000);
        assert_eq!(BenchgateConfig::parse_duration("100us").unwrap(), 100_000);
        assert_eq!(BenchgateConfig::parse_duration("100µs").unwrap(), 100_000);
        assert_eq!(BenchgateConfig::parse_duration("1000ns").unwrap(), 1000);
        assert_eq!(BenchgateConfig::parse_duration("2m").unwrap(), 120_000_000_000);
        assert_eq!(BenchgateConfig::parse_duration("1.5s").unwrap(), 1_500_000_000);
        assert_eq!(BenchgateConfig::parse_duration("2").unwrap(), 2_000_000_000);
        assert!(BenchgateConfig::parse_duration("").is_err());
        assert!(BenchgateConfig::parse_duration("3h").is_err());
        assert!(BenchgateConfig::parse_duration("-1s").is_err());
    }

    #[test]
    fn partial_files_keep_other_defaults() {
        let text = r#"
            [runner]
            warmup_time = "1s"
            samples = 20

            [pipeline]
            platform_policy = "emulate"
            step_timeout = "10m"
        "#;

        let config: BenchgateConfig = toml::from_str(text).unwrap();
        assert_eq!(config.runner.warmup_time, "1s");
        assert_eq!(config.runner.samples, Some(20));
        assert_eq!(config.pipeline.platform_policy, PlatformPolicy::Emulate);
        assert_eq!(
            config.pipeline.step_timeout().unwrap(),
            Some(Duration::from_secs(600))
        );
        // untouched sections keep their defaults
        assert_eq!(config.output.format, "human");
        assert_eq!(config.runner.measurement_time, "5s");
    }

    #[test]
    fn discovery_walks_up() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(
            root.path().join(CONFIG_FILE),
            "[ci]\nregression_threshold = 12.5\n",
        )
        .unwrap();

        let found = BenchgateConfig::find(&nested).unwrap();
        assert_eq!(found, root.path().join(CONFIG_FILE));
        let config = BenchgateConfig::load(found).unwrap();
        assert_eq!(config.ci.regression_threshold, 12.5);
    }

    #[test]
    fn parse_errors_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[runner\n").unwrap();
        let err = BenchgateConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(CONFIG_FILE));
    }
}
