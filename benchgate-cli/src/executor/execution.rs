//! Benchmark Execution
//!
//! Cases run one after another in this process. A panicking routine is
//! caught and recorded as `Crashed`; the remaining cases still run.
//!
//! ```text
//! BenchmarkCase + ExecutionConfig
//!        │  resolve_for_case (group overrides win)
//!        ▼
//!   run_benchmark_loop: warmup → measurement → samples
//!        │
//!        ▼
//!  BenchExecutionResult (samples, cycles, status)
//! ```

use benchgate_core::{
    Bencher, BenchmarkCase, DEFAULT_SAMPLE_COUNT, LoopConfig, Throughput, run_benchmark_loop,
};
use benchgate_report::{BenchmarkStatus, FailureInfo};
use indicatif::{ProgressBar, ProgressStyle};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;
use tracing::{debug, warn};

/// Configuration for benchmark execution
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Warmup time in nanoseconds
    pub warmup_time_ns: u64,
    /// Measurement time in nanoseconds
    pub measurement_time_ns: u64,
    /// Samples per case
    pub samples: usize,
    /// Minimum measured iterations
    pub min_iterations: Option<u64>,
    /// Maximum measured iterations
    pub max_iterations: Option<u64>,
    /// Bootstrap resamples; 0 skips the confidence interval
    pub bootstrap_iterations: usize,
    /// Confidence level for intervals
    pub confidence_level: f64,
    /// Draw a progress bar on stderr
    pub show_progress: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            warmup_time_ns: 3_000_000_000,
            measurement_time_ns: 5_000_000_000,
            samples: DEFAULT_SAMPLE_COUNT,
            min_iterations: None,
            max_iterations: None,
            bootstrap_iterations: benchgate_stats::DEFAULT_BOOTSTRAP_ITERATIONS,
            confidence_level: benchgate_stats::DEFAULT_CONFIDENCE_LEVEL,
            show_progress: true,
        }
    }
}

impl ExecutionConfig {
    /// Sample count and loop settings for one case. Timings and sample
    /// size set on the case's group override the global values.
    pub fn resolve_for_case(&self, case: &BenchmarkCase) -> (usize, LoopConfig) {
        let samples = case.sample_size.unwrap_or(self.samples);
        let loop_config = LoopConfig {
            warmup_ns: case
                .warm_up_time
                .map_or(self.warmup_time_ns, |d| d.as_nanos() as u64),
            measurement_ns: case
                .measurement_time
                .map_or(self.measurement_time_ns, |d| d.as_nanos() as u64),
            min_iterations: self.min_iterations,
            max_iterations: self.max_iterations,
        };
        (samples, loop_config)
    }
}

/// Result from executing a single case
#[derive(Debug)]
pub struct BenchExecutionResult {
    /// `group/name`
    pub benchmark_id: String,
    /// Case name
    pub benchmark_name: String,
    /// Group name
    pub group: String,
    /// Registration file
    pub file: String,
    /// Registration line
    pub line: u32,
    /// Outcome
    pub status: BenchmarkStatus,
    /// Per-iteration nanoseconds, one per sample
    pub samples: Vec<f64>,
    /// Per-iteration ticks, parallel to `samples`
    pub cpu_cycles: Vec<u64>,
    /// Iterations executed, warmup included
    pub iterations: u64,
    /// Declared work per iteration
    pub throughput: Option<Throughput>,
    /// Wall-clock time spent on the case
    pub duration_ns: u64,
    /// Why the case did not pass
    pub failure: Option<FailureInfo>,
}

/// Execute cases and produce results (in-process)
pub struct Executor {
    config: ExecutionConfig,
}

impl Executor {
    /// Executor with the given settings.
    pub fn new(config: ExecutionConfig) -> Self {
        Self { config }
    }

    /// Execute every case in order.
    pub fn execute(&self, cases: &mut [BenchmarkCase]) -> Vec<BenchExecutionResult> {
        let pb = if self.config.show_progress {
            ProgressBar::new(cases.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let mut results = Vec::with_capacity(cases.len());
        for case in cases.iter_mut() {
            pb.set_message(case.id.clone());
            results.push(self.execute_single(case));
            pb.inc(1);
        }

        pb.finish_with_message("Complete");
        results
    }

    fn execute_single(&self, case: &mut BenchmarkCase) -> BenchExecutionResult {
        let (samples, loop_config) = self.config.resolve_for_case(case);
        debug!(case = %case.id, samples, ?loop_config, "running case");

        let start = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            run_benchmark_loop(Bencher::new(samples), loop_config, |b| case.run(b))
        }));
        let duration_ns = start.elapsed().as_nanos() as u64;

        let mut result = BenchExecutionResult {
            benchmark_id: case.id.clone(),
            benchmark_name: case.name.clone(),
            group: case.group.clone(),
            file: case.file.to_string(),
            line: case.line,
            status: BenchmarkStatus::Passed,
            samples: Vec::new(),
            cpu_cycles: Vec::new(),
            iterations: 0,
            throughput: case.throughput,
            duration_ns,
            failure: None,
        };

        match outcome {
            Ok(measured) if measured.samples.is_empty() => {
                warn!(case = %case.id, "no samples recorded");
                result.status = BenchmarkStatus::Failed;
                result.iterations = measured.iterations;
                result.failure = Some(FailureInfo {
                    kind: "no_samples".to_string(),
                    message: "routine recorded no samples; does it call a Bencher iter method?"
                        .to_string(),
                });
            }
            Ok(measured) => {
                result.samples = measured
                    .samples
                    .iter()
                    .map(|s| s.duration_nanos as f64)
                    .collect();
                result.cpu_cycles = measured.samples.iter().map(|s| s.cpu_cycles).collect();
                result.iterations = measured.iterations;
            }
            Err(panic) => {
                let message = if let Some(s) = panic.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                warn!(case = %case.id, %message, "case panicked");
                result.status = BenchmarkStatus::Crashed;
                result.failure = Some(FailureInfo {
                    kind: "panic".to_string(),
                    message,
                });
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchgate_core::BenchmarkGroup;
    use std::time::Duration;

    fn quick_config() -> ExecutionConfig {
        ExecutionConfig {
            warmup_time_ns: 1_000_000,
            measurement_time_ns: 5_000_000,
            samples: 10,
            bootstrap_iterations: 200,
            show_progress: false,
            ..Default::default()
        }
    }

    #[test]
    fn group_overrides_win() {
        let mut group = BenchmarkGroup::new("g");
        group
            .sample_size(20)
            .measurement_time(Duration::from_millis(7))
            .bench_function("a", |b| b.iter(|| 1));
        let cases = group.into_cases();

        let (samples, loop_config) = quick_config().resolve_for_case(&cases[0]);
        assert_eq!(samples, 20);
        assert_eq!(loop_config.measurement_ns, 7_000_000);
        assert_eq!(loop_config.warmup_ns, 1_000_000);
    }

    #[test]
    fn panics_are_contained() {
        let mut group = BenchmarkGroup::new("g");
        group
            .bench_function("boom", |_| panic!("kaboom"))
            .bench_function("ok", |b| b.iter(|| (0..64u64).sum::<u64>()))
            .bench_function("idle", |_| {});
        let mut cases = group.into_cases();

        let results = Executor::new(quick_config()).execute(&mut cases);
        assert_eq!(results.len(), 3);

        assert_eq!(results[0].status, BenchmarkStatus::Crashed);
        let failure = results[0].failure.as_ref().unwrap();
        assert_eq!(failure.kind, "panic");
        assert_eq!(failure.message, "kaboom");

        assert_eq!(results[1].status, BenchmarkStatus::Passed);
        let samples = results[1].samples.len();
        assert!((1..=10).contains(&samples));
        assert_eq!(results[1].cpu_cycles.len(), samples);

        assert_eq!(results[2].status, BenchmarkStatus::Failed);
        assert_eq!(results[2].failure.as_ref().unwrap().kind, "no_samples");
    }
}
