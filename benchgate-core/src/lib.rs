#![warn(missing_docs)]
//! benchgate core
//!
//! The in-process measurement runtime:
//! - `Bencher` and the warmup/measurement loop
//! - wall-clock and cycle-counter timing
//! - benchmark groups registered at link time via `inventory`

mod bencher;
mod group;
mod measure;

pub use bencher::{
    Bencher, BenchmarkResult, DEFAULT_SAMPLE_COUNT, LoopConfig, MIN_SAMPLE_COUNT, Sample,
    run_benchmark_loop,
};
pub use group::{
    BenchmarkCase, BenchmarkGroup, GroupDef, Throughput, registered_cases, registered_groups,
};
pub use measure::{Elapsed, HAS_CYCLE_COUNTER, Instant, Timer};

#[doc(hidden)]
pub use inventory;

/// Anchor so link-time optimisation keeps the registry.
#[used]
#[doc(hidden)]
pub static REGISTRY_ANCHOR: fn() = || {
    for _ in inventory::iter::<GroupDef> {}
};
