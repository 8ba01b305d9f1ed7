#![warn(missing_docs)]
//! # benchgate
//!
//! A two-stage CI pipeline for Rust workspaces and the benchmark harness its
//! second stage runs.
//!
//! - **Check stage**: `cargo fmt --check`, `cargo clippy -D warnings` and
//!   `cargo check`, all on one runner
//! - **Bench stage**: gated on Check, fanned out over four platforms, each
//!   running `cargo bench` with a lockfile-keyed dependency cache
//! - **Harness**: warmup and batched measurement, outlier-aware summaries,
//!   bootstrap confidence intervals and baseline regression checks
//!
//! ## Writing benchmarks
//!
//! ```ignore
//! use benchgate::prelude::*;
//!
//! fn sums(group: &mut BenchmarkGroup) {
//!     let data: Vec<u64> = (0..1024).collect();
//!     group
//!         .throughput(Throughput::Elements(1024))
//!         .bench_function("u64", move |b| b.iter(|| data.iter().sum::<u64>()));
//! }
//!
//! bench_group!("sums", sums);
//!
//! fn main() {
//!     if let Err(e) = benchgate::run() {
//!         eprintln!("Error: {e}");
//!         std::process::exit(1);
//!     }
//! }
//! ```
//!
//! ## The pipeline
//!
//! ```ignore
//! use benchgate::pipeline::{TriggerEvent, Workflow, plan};
//!
//! let workflow = Workflow::standard();
//! let plan = plan(&workflow, &TriggerEvent::PullRequest)?.unwrap();
//! assert_eq!(plan.stages.len(), 2);
//! ```

// Re-export core types
pub use benchgate_core::{
    Bencher, BenchmarkCase, BenchmarkGroup, BenchmarkResult, GroupDef, Throughput, bench_group,
    registered_cases, registered_groups,
};

// Re-export stats
pub use benchgate_stats::{
    BootstrapConfig, BootstrapResult, SummaryStatistics, compute_bootstrap, compute_summary,
};

// Re-export report types
pub use benchgate_report::{Comparison, Report, render_github_workflow};

/// Workflow model, planning and local execution.
pub mod pipeline {
    pub use benchgate_pipeline::*;
}

/// Prelude for benchmark files
pub mod prelude {
    pub use crate::{Bencher, BenchmarkGroup, Throughput, bench_group};
}

/// Run the benchgate harness.
///
/// Call this from a bench target's `main()`:
/// ```ignore
/// fn main() {
///     benchgate::run().unwrap();
/// }
/// ```
pub use benchgate_cli::run;
