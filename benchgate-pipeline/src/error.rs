use crate::graph::GraphError;
use crate::validate::ValidationErrors;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, planning or executing a workflow.
///
/// Step failures are not errors; they are recorded in the run status.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PipelineError {
    /// The workflow violates a structural rule.
    #[error("invalid workflow: {0}")]
    Invalid(#[from] ValidationErrors),

    /// The job graph could not be ordered.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// The workflow file could not be read.
    #[error("failed to read workflow {path}: {source}")]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The workflow file is not valid TOML for a workflow.
    #[error("failed to parse workflow {path}: {source}")]
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: toml::de::Error,
    },

    /// The job thread pool could not be created.
    #[error("failed to build job pool: {0}")]
    Pool(String),
}

/// Errors from the local dependency cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Filesystem access failed.
    #[error("cache I/O on {path}: {source}")]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}
