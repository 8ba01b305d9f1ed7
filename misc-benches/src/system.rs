//! Host description, memory bandwidth and RNG throughput

use benchgate::{BenchmarkGroup, Throughput};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::fmt;
use std::hint::black_box;
use std::num::NonZero;
use std::thread;
use std::time::Duration;
use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};

const NOT_AVAILABLE: &str = "not available";

/// What the benchmarks ran on.
#[derive(Debug, Clone, PartialEq)]
pub struct HostDescription {
    /// Long OS name and version.
    pub os: Option<String>,
    /// Kernel version.
    pub kernel: Option<String>,
    /// CPU architecture as the OS reports it.
    pub arch: Option<String>,
    /// Brand string of the first CPU.
    pub cpu: Option<String>,
    /// Physical cores.
    pub physical_cores: Option<usize>,
    /// Installed memory in bytes.
    pub memory_bytes: u64,
}

impl HostDescription {
    /// Query the running host.
    pub fn collect() -> Self {
        let sys = System::new_with_specifics(
            RefreshKind::new()
                .with_cpu(CpuRefreshKind::new())
                .with_memory(MemoryRefreshKind::new().with_ram()),
        );
        Self {
            os: System::long_os_version(),
            kernel: System::kernel_version(),
            arch: System::cpu_arch(),
            cpu: sys.cpus().first().map(|cpu| cpu.brand().trim().to_string()),
            physical_cores: sys.physical_core_count(),
            memory_bytes: sys.total_memory(),
        }
    }

    /// Installed memory in GiB.
    pub fn memory_gb(&self) -> f64 {
        self.memory_bytes as f64 / (1024.0 * 1024.0 * 1024.0)
    }
}

impl fmt::Display for HostDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let or_na = |v: &Option<String>| v.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string());
        writeln!(
            f,
            "os: {} / {} / {}",
            or_na(&self.os),
            or_na(&self.kernel),
            or_na(&self.arch)
        )?;
        writeln!(f, "cpu: {}", or_na(&self.cpu))?;
        writeln!(
            f,
            "cores: {}",
            self.physical_cores
                .map_or_else(|| NOT_AVAILABLE.to_string(), |c| c.to_string())
        )?;
        write!(f, "mem: {:.1} GB", self.memory_gb())
    }
}

/// Working-set sizes aimed at each level of the memory hierarchy. Half of
/// each size is the source and half the destination.
pub const MEMCPY_SIZES: [(&str, usize); 4] = [
    ("L1", 16 * 1024),
    ("L2", 512 * 1024),
    ("L3", 16 * 1024 * 1024),
    ("RAM", 512 * 1024 * 1024),
];

/// Copy `src` into `dst`; the slices must have equal length.
#[inline(never)]
pub fn memcpy_inner(dst: &mut [u8], src: &[u8]) {
    dst.copy_from_slice(src);
}

/// Draws per thread per iteration of the `rand` cases.
pub const RAND_ITERATIONS: u64 = 100_000_000;

/// Draw `iterations` values from a freshly seeded generator and return the
/// next one.
#[inline(never)]
pub fn rand_inner(iterations: u64) -> u64 {
    let mut rng = StdRng::seed_from_u64(1234);
    for _ in 0..iterations {
        black_box(rng.next_u64());
    }
    rng.next_u64()
}

/// Run [`rand_inner`] on `threads` threads at once.
pub fn rand_threads(threads: usize, iterations: u64) {
    thread::scope(|scope| {
        for _ in 0..threads {
            scope.spawn(|| black_box(rand_inner(iterations)));
        }
    });
}

/// Thread counts measured by the `rand` group.
pub fn max_thread_count() -> usize {
    thread::available_parallelism()
        .map(NonZero::<usize>::get)
        .unwrap_or(1)
}

/// Register the `memcpy` cases. Buffers are allocated on first run.
pub fn memcpy(group: &mut BenchmarkGroup) {
    for (name, size) in MEMCPY_SIZES {
        group.throughput(Throughput::Bytes(size as u64));

        let mut buffers: Option<(Vec<u8>, Vec<u8>)> = None;
        group.bench_function(format!("memcpy = {name}"), move |b| {
            let (dst, src) =
                buffers.get_or_insert_with(|| (vec![0u8; size / 2], vec![0u8; size / 2]));
            b.iter(|| memcpy_inner(dst.as_mut_slice(), src.as_slice()))
        });
    }
}

/// Register the `rand` cases, one per thread count.
pub fn rand_throughput(group: &mut BenchmarkGroup) {
    group
        .throughput(Throughput::Elements(RAND_ITERATIONS))
        .measurement_time(Duration::from_secs(4))
        .warm_up_time(Duration::from_secs(2))
        .sample_size(10);

    for threads in 1..=max_thread_count() {
        group.bench_function(format!("threads = {threads}"), move |b| {
            b.iter(|| rand_threads(threads, RAND_ITERATIONS))
        });
    }
}
