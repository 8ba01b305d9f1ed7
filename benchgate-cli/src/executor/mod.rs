//! Benchmark Executor
//!
//! Runs the planned cases in-process and turns their samples into a report.
//!
//! ```text
//! BenchmarkCase (registered via bench_group!)
//!       │
//!       ▼
//! ┌─────────────┐
//! │  execution  │  Warmup, measurement, panic capture
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ statistics  │  Summary statistics (parallel)
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │   report    │  Bootstrap CIs, throughput, cycles, metadata
//! └─────────────┘
//! ```

mod execution;
mod metadata;
mod report;
mod statistics;

pub use execution::{BenchExecutionResult, ExecutionConfig, Executor};
pub use metadata::{build_report_meta, system_info};
pub use report::build_report;
pub use statistics::compute_statistics;
