//! Quaternion interpolation
//!
//! Component-wise lerp, normalized lerp and spherical lerp over arrays sized
//! for L1 and L2. Two extra input sets steer slerp's branches: pairs that
//! are often identical hit the near-parallel fallback, and all-positive
//! components never take the shortest-path flip.

use crate::util::{l1_sized_count, l2_sized_count};
use benchgate::{BenchmarkGroup, Throughput};
use glam::{Quat, Vec4};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

/// A rotation drawn uniformly from SO(3).
pub fn random_quat<R: Rng + ?Sized>(rng: &mut R) -> Quat {
    let (s0, c0) = rng.gen_range(0.0f32..TAU).sin_cos();
    let (s1, c1) = rng.gen_range(0.0f32..TAU).sin_cos();
    let r = rng.gen_range(0.0f32..1.0);

    let t0 = (1.0 - r).sqrt();
    let t1 = r.sqrt();
    Quat::from_xyzw(t0 * s0, t0 * c0, t1 * s1, t1 * c1)
}

/// `count` uniform rotations.
pub fn random_quat_array<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<Quat> {
    std::iter::repeat_with(|| random_quat(rng))
        .take(count)
        .collect()
}

/// Two arrays where each left entry has an even chance of being a copy of
/// the right entry at the same index.
pub fn random_duplicate_quat_arrays<R: Rng + ?Sized>(rng: &mut R, count: usize) -> [Vec<Quat>; 2] {
    let mut l = random_quat_array(rng, count);
    let r = random_quat_array(rng, count);
    for (l, r) in l.iter_mut().zip(&r) {
        if rng.r#gen::<bool>() {
            *l = *r;
        }
    }
    [l, r]
}

/// Uniform rotations with every component made non-negative.
pub fn random_positive_quat_array<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<Quat> {
    random_quat_array(rng, count)
        .into_iter()
        .map(|q| Quat::from_vec4(Vec4::from(q).abs()))
        .collect()
}

/// Component-wise lerp; the result is not normalized.
#[inline]
pub fn quat_lerp(l: Quat, r: Quat, a: f32) -> Quat {
    Quat::from_vec4(Vec4::from(l).lerp(Vec4::from(r), a))
}

/// Shortest-path lerp followed by normalization.
#[inline]
pub fn quat_nlerp(l: Quat, r: Quat, a: f32) -> Quat {
    l.lerp(r, a)
}

/// Constant angular velocity interpolation.
#[inline]
pub fn quat_slerp(l: Quat, r: Quat, a: f32) -> Quat {
    l.slerp(r, a)
}

/// Interpolation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    /// [`quat_lerp`]
    Lerp,
    /// [`quat_nlerp`]
    Nlerp,
    /// [`quat_slerp`]
    Slerp,
}

/// Operands, blend factor and output buffer.
#[derive(Debug, Clone)]
pub struct QuatParams {
    /// Results.
    pub dst: Vec<Quat>,
    /// Start and end rotations.
    pub src: [Vec<Quat>; 2],
    /// Blend factor for every pair.
    pub alpha: f32,
}

impl QuatParams {
    /// Interpolate between `src` pairs at the midpoint.
    pub fn new(src: [Vec<Quat>; 2]) -> Self {
        Self {
            dst: vec![Quat::IDENTITY; src[0].len()],
            src,
            alpha: 0.5,
        }
    }
}

#[inline(never)]
fn interpolate_with<F>(params: &mut QuatParams, f: F)
where
    F: Fn(Quat, Quat, f32) -> Quat,
{
    let [l, r] = &params.src;
    let alpha = params.alpha;
    for ((dst, &l), &r) in params.dst.iter_mut().zip(l).zip(r) {
        *dst = f(l, r, alpha);
    }
}

/// Interpolate every pair.
pub fn interpolate(params: &mut QuatParams, method: Interpolation) {
    match method {
        Interpolation::Lerp => interpolate_with(params, quat_lerp),
        Interpolation::Nlerp => interpolate_with(params, quat_nlerp),
        Interpolation::Slerp => interpolate_with(params, quat_slerp),
    }
}

/// Register the `quat` cases at L1 and L2 sizes.
pub fn quat(group: &mut BenchmarkGroup) {
    let l1 = l1_sized_count::<(Quat, Quat, Quat)>();
    let l2 = l2_sized_count::<(Quat, Quat, Quat)>();

    for count in [l1, l2] {
        group.throughput(Throughput::Elements(count as u64));

        let mut rng = StdRng::seed_from_u64(1234);
        let uniform = QuatParams::new([
            random_quat_array(&mut rng, count),
            random_quat_array(&mut rng, count),
        ]);
        let duplicates = QuatParams::new(random_duplicate_quat_arrays(&mut rng, count));
        let positive = QuatParams::new([
            random_positive_quat_array(&mut rng, count),
            random_positive_quat_array(&mut rng, count),
        ]);

        let cases = [
            ("lerp", Interpolation::Lerp, &uniform),
            ("nlerp", Interpolation::Nlerp, &uniform),
            ("slerp", Interpolation::Slerp, &uniform),
            ("slerp (duplicates)", Interpolation::Slerp, &duplicates),
            ("slerp (positive)", Interpolation::Slerp, &positive),
        ];
        for (label, method, params) in cases {
            let mut params = params.clone();
            group.bench_function(format!("count = {count}, {label}"), move |b| {
                b.iter(|| interpolate(&mut params, method))
            });
        }
    }
}
