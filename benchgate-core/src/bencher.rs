//! Bencher
//!
//! The handle a benchmark routine receives. Iterations are grouped into
//! samples: warmup timings estimate the cost of one iteration, then the
//! measurement phase batches enough iterations per sample that the target
//! sample count fits into the measurement time. Each recorded sample is the
//! per-iteration average of its batch.

use crate::measure::{Elapsed, Instant, Timer};
use std::hint::black_box;

/// Samples collected when a group does not override it.
pub const DEFAULT_SAMPLE_COUNT: usize = 100;

/// Fewer samples than this are raised to it.
pub const MIN_SAMPLE_COUNT: usize = 10;

/// One recorded sample, averaged over its batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sample {
    /// Nanoseconds per iteration.
    pub duration_nanos: u64,
    /// Hardware ticks per iteration (0 without a cycle counter).
    pub cpu_cycles: u64,
}

/// Output of one measurement run.
#[derive(Debug, Clone, Default)]
pub struct BenchmarkResult {
    /// Recorded samples.
    pub samples: Vec<Sample>,
    /// Iterations executed, warmup included.
    pub iterations: u64,
    /// Sum of the per-iteration sample durations.
    pub total_time_ns: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Warmup,
    Measure,
}

#[derive(Debug, Default)]
struct Batch {
    nanos: u64,
    cycles: u64,
    iters: u64,
}

/// Iteration driver handed to benchmark routines.
pub struct Bencher {
    phase: Phase,
    target_samples: usize,
    iters_per_sample: u64,
    batch: Batch,
    samples: Vec<Sample>,
    warmup_nanos: u64,
    warmup_iters: u64,
    total_iterations: u64,
}

impl Default for Bencher {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_COUNT)
    }
}

impl Bencher {
    /// Create a bencher that aims for `target_samples` samples.
    pub fn new(target_samples: usize) -> Self {
        let target_samples = target_samples.max(MIN_SAMPLE_COUNT);
        Self {
            phase: Phase::Warmup,
            target_samples,
            iters_per_sample: 1,
            batch: Batch::default(),
            samples: Vec::with_capacity(target_samples),
            warmup_nanos: 0,
            warmup_iters: 0,
            total_iterations: 0,
        }
    }

    /// Average iteration time observed during warmup.
    pub fn estimated_iter_time_ns(&self) -> Option<u64> {
        (self.warmup_iters > 0).then(|| self.warmup_nanos / self.warmup_iters)
    }

    /// Leave warmup and size batches for the given measurement budget.
    pub fn start_measurement(&mut self, measurement_time_ns: u64) {
        self.phase = Phase::Measure;
        let per_sample = measurement_time_ns / self.target_samples as u64;
        self.iters_per_sample = match self.estimated_iter_time_ns() {
            Some(iter_ns) if iter_ns > 0 => (per_sample / iter_ns).max(1),
            _ => 1,
        };
        self.batch = Batch::default();
    }

    /// Override the batch size chosen by [`Bencher::start_measurement`].
    pub fn set_iters_per_sample(&mut self, iters: u64) {
        self.iters_per_sample = iters.max(1);
    }

    /// Iterations currently grouped into one sample.
    pub fn iters_per_sample(&self) -> u64 {
        self.iters_per_sample
    }

    /// Account `elapsed` as the total time of `iters` iterations.
    #[inline]
    fn record(&mut self, elapsed: Elapsed, iters: u64) {
        self.total_iterations += iters;
        match self.phase {
            Phase::Warmup => {
                self.warmup_nanos += elapsed.nanos;
                self.warmup_iters += iters;
            }
            Phase::Measure => {
                self.batch.nanos += elapsed.nanos;
                self.batch.cycles += elapsed.cycles;
                self.batch.iters += iters;
                if self.batch.iters >= self.iters_per_sample {
                    self.flush();
                }
            }
        }
    }

    fn flush(&mut self) {
        let batch = std::mem::take(&mut self.batch);
        if batch.iters == 0 || self.samples.len() >= self.target_samples {
            return;
        }
        self.samples.push(Sample {
            duration_nanos: batch.nanos / batch.iters,
            cpu_cycles: batch.cycles / batch.iters,
        });
    }

    /// Time one call of `f`.
    #[inline]
    pub fn iter<T, F>(&mut self, mut f: F)
    where
        F: FnMut() -> T,
    {
        let timer = Timer::start();
        black_box(f());
        let elapsed = timer.stop();
        self.record(elapsed, 1);
    }

    /// Time `routine` on a fresh input from `setup`; setup is not timed.
    #[inline]
    pub fn iter_with_setup<I, S, F, R>(&mut self, mut setup: S, mut routine: F)
    where
        S: FnMut() -> I,
        F: FnMut(I) -> R,
    {
        let input = setup();
        let timer = Timer::start();
        black_box(routine(input));
        let elapsed = timer.stop();
        self.record(elapsed, 1);
    }

    /// Run `routine` `batch_size` times on one borrowed input under a single
    /// timer. Each call counts as one iteration, so batches are sized the
    /// same as with [`Bencher::iter`]. Useful when a single call is below
    /// timer resolution.
    #[inline]
    pub fn iter_batched<I, S, F, R>(&mut self, batch_size: u64, mut setup: S, mut routine: F)
    where
        S: FnMut() -> I,
        F: FnMut(&I) -> R,
    {
        let batch_size = batch_size.max(1);
        let input = setup();
        let timer = Timer::start();
        for _ in 0..batch_size {
            black_box(routine(black_box(&input)));
        }
        let elapsed = timer.stop();
        self.record(elapsed, batch_size);
    }

    /// Whether the target sample count has been reached.
    pub fn has_enough_samples(&self) -> bool {
        self.samples.len() >= self.target_samples
    }

    /// Samples recorded so far.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Iterations executed so far, warmup included.
    pub fn iteration_count(&self) -> u64 {
        self.total_iterations
    }

    /// Target sample count.
    pub fn target_samples(&self) -> usize {
        self.target_samples
    }

    /// Flush the partial batch and return the result.
    pub fn finish(mut self) -> BenchmarkResult {
        self.flush();
        let total_time_ns = self.samples.iter().map(|s| s.duration_nanos).sum();
        BenchmarkResult {
            samples: self.samples,
            iterations: self.total_iterations,
            total_time_ns,
        }
    }
}

/// Time budget and iteration bounds for [`run_benchmark_loop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    /// Warmup duration in nanoseconds.
    pub warmup_ns: u64,
    /// Measurement duration in nanoseconds.
    pub measurement_ns: u64,
    /// Measurement iterations required before stopping.
    pub min_iterations: Option<u64>,
    /// Hard cap on measurement iterations.
    pub max_iterations: Option<u64>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            warmup_ns: 3_000_000_000,
            measurement_ns: 5_000_000_000,
            min_iterations: None,
            max_iterations: None,
        }
    }
}

/// Warm up, measure, and finish.
///
/// Measurement stops when the sample target is reached or the time budget
/// is spent, but never before `min_iterations`; `max_iterations` always
/// stops it (it is raised to `min_iterations` if lower).
pub fn run_benchmark_loop<F>(mut bencher: Bencher, config: LoopConfig, mut routine: F) -> BenchmarkResult
where
    F: FnMut(&mut Bencher),
{
    let warmup_start = Instant::now();
    while warmup_start.elapsed().as_nanos() < u128::from(config.warmup_ns) {
        routine(&mut bencher);
    }

    bencher.start_measurement(config.measurement_ns);

    let measure_start = Instant::now();
    let base = bencher.iteration_count();
    let min_iterations = config.min_iterations.unwrap_or(0);
    let max_iterations = config.max_iterations.unwrap_or(u64::MAX).max(min_iterations);

    loop {
        let done = bencher.iteration_count().saturating_sub(base);
        if done >= max_iterations {
            break;
        }
        let out_of_time = measure_start.elapsed().as_nanos() >= u128::from(config.measurement_ns);
        if (bencher.has_enough_samples() || out_of_time) && done >= min_iterations {
            break;
        }
        routine(&mut bencher);
    }

    bencher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn work() -> u64 {
        (0..1000u64).sum()
    }

    #[test]
    fn warmup_records_no_samples() {
        let mut bencher = Bencher::new(10);
        for _ in 0..5 {
            bencher.iter_with_setup(|| vec![1, 2, 3], |v| v.iter().sum::<i32>());
        }
        assert!(bencher.samples().is_empty());
        assert_eq!(bencher.iteration_count(), 5);
        assert!(bencher.estimated_iter_time_ns().is_some());
    }

    #[test]
    fn batches_fill_target_sample_count() {
        let mut bencher = Bencher::new(10);
        bencher.start_measurement(0);
        bencher.set_iters_per_sample(5);
        for _ in 0..50 {
            bencher.iter(work);
        }
        let result = bencher.finish();
        assert_eq!(result.samples.len(), 10);
        assert_eq!(result.iterations, 50);
    }

    #[test]
    fn samples_stop_at_target() {
        let mut bencher = Bencher::new(10);
        bencher.start_measurement(0);
        for _ in 0..100 {
            bencher.iter(work);
        }
        assert_eq!(bencher.finish().samples.len(), 10);
    }

    #[test]
    fn batched_iterations_count_each_call() {
        let mut bencher = Bencher::new(10);
        bencher.start_measurement(0);
        bencher.iter_batched(8, || vec![1u32; 16], |v| v.iter().sum::<u32>());
        assert_eq!(bencher.iteration_count(), 8);
        assert_eq!(bencher.samples().len(), 1);
    }

    #[test]
    fn batched_warmup_sizes_samples_like_single_calls() {
        let mut single = Bencher::new(10);
        for _ in 0..8 {
            single.record(Elapsed { nanos: 100, cycles: 0 }, 1);
        }
        let mut batched = Bencher::new(10);
        batched.record(Elapsed { nanos: 800, cycles: 0 }, 8);

        assert_eq!(single.estimated_iter_time_ns(), Some(100));
        assert_eq!(batched.estimated_iter_time_ns(), Some(100));

        single.start_measurement(1_000_000);
        batched.start_measurement(1_000_000);
        assert_eq!(single.iters_per_sample(), 1_000);
        assert_eq!(batched.iters_per_sample(), single.iters_per_sample());
    }

    #[test]
    fn batched_calls_fill_a_sample_together() {
        let mut bencher = Bencher::new(10);
        bencher.start_measurement(0);
        bencher.set_iters_per_sample(16);
        bencher.iter_batched(8, || vec![1u32; 16], |v| v.iter().sum::<u32>());
        assert!(bencher.samples().is_empty());
        bencher.iter_batched(8, || vec![1u32; 16], |v| v.iter().sum::<u32>());
        assert_eq!(bencher.samples().len(), 1);
        assert_eq!(bencher.iteration_count(), 16);
    }

    #[test]
    fn minimum_sample_count_enforced() {
        assert_eq!(Bencher::new(2).target_samples(), MIN_SAMPLE_COUNT);
    }

    #[test]
    fn loop_honors_min_iterations() {
        let config = LoopConfig {
            warmup_ns: 0,
            measurement_ns: 0,
            min_iterations: Some(100),
            max_iterations: Some(100),
        };
        let result = run_benchmark_loop(Bencher::new(10), config, |b| b.iter(|| 42_u64));
        assert_eq!(result.iterations, 100);
    }

    #[test]
    fn loop_raises_max_to_min() {
        let config = LoopConfig {
            warmup_ns: 0,
            measurement_ns: 0,
            min_iterations: Some(200),
            max_iterations: Some(50),
        };
        let result = run_benchmark_loop(Bencher::new(10), config, |b| b.iter(|| 7_u64));
        assert_eq!(result.iterations, 200);
    }
}
