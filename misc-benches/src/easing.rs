//! Smoothstep through different call paths
//!
//! The same `(3 - 2t) t²` evaluated inline, through a zero-sized curve type,
//! through a function the optimizer may not inline, and through a match on
//! an easing enum. The indirect variants read inputs through a random index
//! array to defeat vectorization.

use crate::util::random_array;
use benchgate::{BenchmarkGroup, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// A function of `t` in `[0, 1]`.
pub trait Curve {
    /// Value at `t`. Inputs outside `[0, 1]` are not clamped.
    fn sample_unchecked(&self, t: f32) -> f32;
}

/// Cubic Hermite smoothstep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SmoothStep;

impl Curve for SmoothStep {
    #[inline]
    fn sample_unchecked(&self, t: f32) -> f32 {
        (3.0 - 2.0 * t) * t * t
    }
}

/// A handful of standard easing functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EaseFunction {
    /// `t`
    Linear,
    /// `t²`
    QuadraticIn,
    /// `1 - (1 - t)²`
    QuadraticOut,
    /// `(3 - 2t) t²`
    SmoothStep,
    /// `t³ (t (6t - 15) + 10)`
    SmootherStep,
}

impl Curve for EaseFunction {
    #[inline]
    fn sample_unchecked(&self, t: f32) -> f32 {
        match self {
            EaseFunction::Linear => t,
            EaseFunction::QuadraticIn => t * t,
            EaseFunction::QuadraticOut => 1.0 - (1.0 - t) * (1.0 - t),
            EaseFunction::SmoothStep => SmoothStep.sample_unchecked(t),
            EaseFunction::SmootherStep => t * t * t * (t * (6.0 * t - 15.0) + 10.0),
        }
    }
}

/// Smoothstep that stays a call.
#[inline(never)]
pub fn smoothstep_noinline(t: f32) -> f32 {
    (3.0 - 2.0 * t) * t * t
}

/// Call path being measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Expression written in the loop.
    Explicit,
    /// [`SmoothStep`].
    Unit,
    /// [`smoothstep_noinline`].
    NoInline,
    /// [`EaseFunction::SmoothStep`].
    Enum,
}

impl Variant {
    /// Every variant, in reporting order.
    pub const ALL: [Variant; 4] = [
        Variant::Explicit,
        Variant::Unit,
        Variant::NoInline,
        Variant::Enum,
    ];

    /// Case name.
    pub fn label(self) -> &'static str {
        match self {
            Variant::Explicit => "explicit",
            Variant::Unit => "unit",
            Variant::NoInline => "noinline",
            Variant::Enum => "enum",
        }
    }
}

/// Sequential inputs and output buffer.
#[derive(Debug, Clone)]
pub struct SmoothstepParams {
    /// Results.
    pub dst: Vec<f32>,
    /// Inputs in `[0, 1)`.
    pub src: Vec<f32>,
}

impl SmoothstepParams {
    /// `count` random inputs.
    pub fn random(rng: &mut StdRng, count: usize) -> Self {
        Self {
            dst: vec![0.0; count],
            src: random_array(rng, count),
        }
    }
}

#[inline(never)]
fn direct_with<F: Fn(f32) -> f32>(params: &mut SmoothstepParams, f: F) {
    for (dst, &t) in params.dst.iter_mut().zip(&params.src) {
        *dst = f(t);
    }
}

/// Evaluate every input in order.
pub fn smoothstep_loop(params: &mut SmoothstepParams, variant: Variant) {
    match variant {
        Variant::Explicit => direct_with(params, |t| (3.0 - 2.0 * t) * t * t),
        Variant::Unit => direct_with(params, |t| SmoothStep.sample_unchecked(t)),
        Variant::NoInline => direct_with(params, smoothstep_noinline),
        Variant::Enum => {
            let f = EaseFunction::SmoothStep;
            direct_with(params, |t| f.sample_unchecked(t))
        }
    }
}

/// Inputs read through an index array.
#[derive(Debug, Clone)]
pub struct IndirectParams {
    /// Results.
    pub dst: Vec<f32>,
    /// Inputs in `[0, 1)`.
    pub src: Vec<f32>,
    /// `dst[i]` is computed from `src[index[i]]`.
    pub index: Vec<usize>,
}

impl IndirectParams {
    /// `count` random inputs and indices.
    pub fn random(rng: &mut StdRng, count: usize) -> Self {
        let index = (0..count).map(|_| rng.gen_range(0..count)).collect();
        Self {
            dst: vec![0.0; count],
            src: random_array(rng, count),
            index,
        }
    }
}

#[inline(never)]
fn indirect_with<F: Fn(f32) -> f32>(params: &mut IndirectParams, f: F) {
    for (dst, &i) in params.dst.iter_mut().zip(&params.index) {
        *dst = f(params.src[i]);
    }
}

/// Evaluate every input in index order.
pub fn smoothstep_indirect_loop(params: &mut IndirectParams, variant: Variant) {
    match variant {
        Variant::Explicit => indirect_with(params, |t| (3.0 - 2.0 * t) * t * t),
        Variant::Unit => indirect_with(params, |t| SmoothStep.sample_unchecked(t)),
        Variant::NoInline => indirect_with(params, smoothstep_noinline),
        Variant::Enum => {
            let f = EaseFunction::SmoothStep;
            indirect_with(params, |t| f.sample_unchecked(t))
        }
    }
}

fn short_timings(group: &mut BenchmarkGroup, count: usize) {
    group
        .throughput(Throughput::Elements(count as u64))
        .warm_up_time(Duration::from_millis(100))
        .measurement_time(Duration::from_millis(1000));
}

/// Register the `smoothstep` cases.
pub fn smoothstep(group: &mut BenchmarkGroup) {
    const COUNT: usize = 32 * 1024;
    short_timings(group, COUNT);

    let params = SmoothstepParams::random(&mut StdRng::seed_from_u64(1234), COUNT);
    for variant in Variant::ALL {
        let mut params = params.clone();
        group.bench_function(variant.label(), move |b| {
            b.iter(|| smoothstep_loop(&mut params, variant))
        });
    }
}

/// Register the `smoothstep_indirect` cases.
pub fn smoothstep_indirect(group: &mut BenchmarkGroup) {
    const COUNT: usize = 4 * 1024;
    short_timings(group, COUNT);

    let params = IndirectParams::random(&mut StdRng::seed_from_u64(1234), COUNT);
    for variant in Variant::ALL {
        let mut params = params.clone();
        group.bench_function(variant.label(), move |b| {
            b.iter(|| smoothstep_indirect_loop(&mut params, variant))
        });
    }
}
