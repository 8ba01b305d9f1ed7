//! Benchmark groups
//!
//! A group is registered at link time with [`bench_group!`](crate::bench_group)
//! and builds its cases when the harness asks for them. Group-level settings
//! (throughput, timings, sample size) apply to every case added after them.

use crate::bencher::Bencher;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Amount of work one iteration performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Throughput {
    /// Logical elements processed per iteration.
    Elements(u64),
    /// Bytes processed per iteration.
    Bytes(u64),
}

impl Throughput {
    /// Units processed per iteration.
    pub fn per_iteration(&self) -> u64 {
        match *self {
            Throughput::Elements(n) | Throughput::Bytes(n) => n,
        }
    }

    /// Rate for a given per-iteration time.
    pub fn per_second(&self, iteration_ns: f64) -> f64 {
        if iteration_ns <= 0.0 {
            return 0.0;
        }
        self.per_iteration() as f64 * 1e9 / iteration_ns
    }
}

/// Registration record for a group, collected with `inventory`.
pub struct GroupDef {
    /// Group name; case ids are `name/case`.
    pub name: &'static str,
    /// Source file of the registration.
    pub file: &'static str,
    /// Source line of the registration.
    pub line: u32,
    /// Adds the group's cases.
    pub register: fn(&mut BenchmarkGroup),
}

inventory::collect!(GroupDef);

type Routine = Box<dyn FnMut(&mut Bencher) + Send>;

/// One runnable benchmark.
pub struct BenchmarkCase {
    /// `group/name`.
    pub id: String,
    /// Owning group.
    pub group: String,
    /// Case name within the group.
    pub name: String,
    /// Work per iteration, if declared.
    pub throughput: Option<Throughput>,
    /// Warmup override.
    pub warm_up_time: Option<Duration>,
    /// Measurement override.
    pub measurement_time: Option<Duration>,
    /// Sample count override.
    pub sample_size: Option<usize>,
    /// Source file of the owning group.
    pub file: &'static str,
    /// Source line of the owning group.
    pub line: u32,
    routine: Routine,
}

impl BenchmarkCase {
    /// Invoke the routine once.
    pub fn run(&mut self, bencher: &mut Bencher) {
        (self.routine)(bencher)
    }
}

impl fmt::Debug for BenchmarkCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BenchmarkCase")
            .field("id", &self.id)
            .field("throughput", &self.throughput)
            .field("sample_size", &self.sample_size)
            .finish_non_exhaustive()
    }
}

/// Builder passed to a group's register function.
pub struct BenchmarkGroup {
    name: String,
    file: &'static str,
    line: u32,
    throughput: Option<Throughput>,
    warm_up_time: Option<Duration>,
    measurement_time: Option<Duration>,
    sample_size: Option<usize>,
    cases: Vec<BenchmarkCase>,
}

impl BenchmarkGroup {
    /// Start an empty group.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file: "",
            line: 0,
            throughput: None,
            warm_up_time: None,
            measurement_time: None,
            sample_size: None,
            cases: Vec::new(),
        }
    }

    fn from_def(def: &GroupDef) -> Self {
        let mut group = Self::new(def.name);
        group.file = def.file;
        group.line = def.line;
        (def.register)(&mut group);
        group
    }

    /// Group name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Work per iteration for cases added from now on.
    pub fn throughput(&mut self, throughput: Throughput) -> &mut Self {
        self.throughput = Some(throughput);
        self
    }

    /// Warmup duration for cases added from now on.
    pub fn warm_up_time(&mut self, time: Duration) -> &mut Self {
        self.warm_up_time = Some(time);
        self
    }

    /// Measurement duration for cases added from now on.
    pub fn measurement_time(&mut self, time: Duration) -> &mut Self {
        self.measurement_time = Some(time);
        self
    }

    /// Sample count for cases added from now on.
    pub fn sample_size(&mut self, samples: usize) -> &mut Self {
        self.sample_size = Some(samples);
        self
    }

    /// Add a case. Names must be unique within the group; a repeated name
    /// replaces the earlier case.
    pub fn bench_function<F>(&mut self, name: impl Into<String>, routine: F) -> &mut Self
    where
        F: FnMut(&mut Bencher) + Send + 'static,
    {
        let name = name.into();
        self.cases.retain(|c| c.name != name);
        self.cases.push(BenchmarkCase {
            id: format!("{}/{}", self.name, name),
            group: self.name.clone(),
            name,
            throughput: self.throughput,
            warm_up_time: self.warm_up_time,
            measurement_time: self.measurement_time,
            sample_size: self.sample_size,
            file: self.file,
            line: self.line,
            routine: Box::new(routine),
        });
        self
    }

    /// Cases added so far.
    pub fn cases(&self) -> &[BenchmarkCase] {
        &self.cases
    }

    /// Consume the group.
    pub fn into_cases(self) -> Vec<BenchmarkCase> {
        self.cases
    }
}

/// Build every registered group, sorted by name.
pub fn registered_groups() -> Vec<BenchmarkGroup> {
    let mut defs: Vec<&GroupDef> = inventory::iter::<GroupDef>.into_iter().collect();
    defs.sort_by_key(|d| d.name);
    defs.into_iter().map(BenchmarkGroup::from_def).collect()
}

/// Every registered case across all groups.
pub fn registered_cases() -> Vec<BenchmarkCase> {
    registered_groups()
        .into_iter()
        .flat_map(BenchmarkGroup::into_cases)
        .collect()
}

/// Register a benchmark group.
///
/// ```ignore
/// fn lerp(group: &mut BenchmarkGroup) {
///     group.bench_function("vec3", |b| b.iter(|| a.lerp(c, 0.5)));
/// }
/// bench_group!("lerp", lerp);
/// ```
#[macro_export]
macro_rules! bench_group {
    ($name:expr, $register:path) => {
        $crate::inventory::submit! {
            $crate::GroupDef {
                name: $name,
                file: file!(),
                line: line!(),
                register: $register,
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_group(group: &mut BenchmarkGroup) {
        group
            .throughput(Throughput::Elements(4))
            .bench_function("a", |b| b.iter(|| 1 + 1));
        group
            .sample_size(20)
            .bench_function("b", |b| b.iter(|| 2 + 2));
    }

    crate::bench_group!("core-test", sample_group);

    #[test]
    fn settings_apply_to_later_cases() {
        let mut group = BenchmarkGroup::new("g");
        sample_group(&mut group);
        let cases = group.cases();
        assert_eq!(cases[0].id, "g/a");
        assert_eq!(cases[0].sample_size, None);
        assert_eq!(cases[1].sample_size, Some(20));
        assert_eq!(cases[1].throughput, Some(Throughput::Elements(4)));
    }

    #[test]
    fn duplicate_name_replaces_case() {
        let mut group = BenchmarkGroup::new("g");
        group.bench_function("x", |b| b.iter(|| 1));
        group.bench_function("x", |b| b.iter(|| 2));
        assert_eq!(group.cases().len(), 1);
    }

    #[test]
    fn registered_group_is_discovered() {
        let groups = registered_groups();
        let group = groups.iter().find(|g| g.name() == "core-test").unwrap();
        assert_eq!(group.cases().len(), 2);
        assert!(group.cases()[0].file.ends_with("group.rs"));
    }

    #[test]
    fn throughput_rate() {
        let t = Throughput::Bytes(1024);
        assert!((t.per_second(1_000.0) - 1.024e9).abs() < 1.0);
        assert_eq!(t.per_second(0.0), 0.0);
    }
}
