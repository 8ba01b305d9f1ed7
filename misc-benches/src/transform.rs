//! Transform composition and rotation renormalization
//!
//! Repeated rotation drifts a quaternion away from unit length. These
//! kernels measure what it costs to correct that drift: always, only when it
//! exceeds a tolerance, or with a one-step Newton approximation.

use crate::util::{l1_sized_count, random_axis_array, random_array, random_transform_array};
use benchgate::{BenchmarkGroup, Throughput};
use glam::{Quat, Vec3};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Squared-length drift tolerated by [`Renormalize::Reactive`].
pub const REACTIVE_TOLERANCE: f32 = 1e-4;

/// Translation, rotation and scale, applied scale first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Offset applied last.
    pub translation: Vec3,
    /// Orientation.
    pub rotation: Quat,
    /// Per-axis scale applied first.
    pub scale: Vec3,
}

impl Transform {
    /// No translation, rotation or scaling.
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// A pure rotation.
    pub const fn from_rotation(rotation: Quat) -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation,
            scale: Vec3::ONE,
        }
    }

    /// Map a point from local to parent space.
    #[inline]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation * (self.scale * point) + self.translation
    }

    /// Rotate around a unit `axis` by `angle` radians. The result is not
    /// renormalized.
    #[inline]
    pub fn rotate_axis(&mut self, axis: Vec3, angle: f32) {
        self.rotation = Quat::from_axis_angle(axis, angle) * self.rotation;
    }
}

/// Compose `l * r` without touching the rotation's length.
#[inline]
pub fn mul_transforms(l: &Transform, r: &Transform) -> Transform {
    Transform {
        translation: l.transform_point(r.translation),
        rotation: l.rotation * r.rotation,
        scale: l.scale * r.scale,
    }
}

/// Compose `l * r` and normalize the rotation.
#[inline]
pub fn mul_transforms_normalized(l: &Transform, r: &Transform) -> Transform {
    Transform {
        rotation: (l.rotation * r.rotation).normalize(),
        ..mul_transforms(l, r)
    }
}

/// Renormalize only when the squared length is off by more than
/// [`REACTIVE_TOLERANCE`].
#[inline]
pub fn reactive_renormalize(q: Quat) -> Quat {
    let length_squared = q.length_squared();
    if (1.0 - length_squared).abs() > REACTIVE_TOLERANCE {
        q / length_squared.sqrt()
    } else {
        q
    }
}

/// First-order approximation of `q / |q|`, accurate near unit length.
#[inline]
pub fn fast_renormalize(q: Quat) -> Quat {
    q * (0.5 * (3.0 - q.length_squared()))
}

/// How a rotation is brought back to unit length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Renormalize {
    /// Leave it.
    Never,
    /// Divide by the exact length.
    Always,
    /// Exact, but only past the tolerance.
    Reactive,
    /// [`fast_renormalize`].
    Fast,
}

impl Renormalize {
    /// Every strategy, in reporting order.
    pub const ALL: [Renormalize; 4] = [
        Renormalize::Never,
        Renormalize::Always,
        Renormalize::Reactive,
        Renormalize::Fast,
    ];

    /// Name used in case ids.
    pub fn label(self) -> &'static str {
        match self {
            Renormalize::Never => "false",
            Renormalize::Always => "true",
            Renormalize::Reactive => "reactive",
            Renormalize::Fast => "fast",
        }
    }

    /// Apply to one quaternion.
    pub fn apply(self, q: Quat) -> Quat {
        match self {
            Renormalize::Never => q,
            Renormalize::Always => q.normalize(),
            Renormalize::Reactive => reactive_renormalize(q),
            Renormalize::Fast => fast_renormalize(q),
        }
    }
}

/// Inputs and output buffer for pairwise composition.
#[derive(Debug, Clone)]
pub struct TransformMulParams {
    /// Results.
    pub dst: Vec<Transform>,
    /// Left and right operands.
    pub src: [Vec<Transform>; 2],
}

impl TransformMulParams {
    /// `count` random operand pairs.
    pub fn random(rng: &mut StdRng, count: usize) -> Self {
        Self {
            dst: vec![Transform::IDENTITY; count],
            src: [
                random_transform_array(rng, count),
                random_transform_array(rng, count),
            ],
        }
    }
}

#[inline(never)]
fn mul_with<F>(params: &mut TransformMulParams, f: F)
where
    F: Fn(&Transform, &Transform) -> Transform,
{
    let [l, r] = &params.src;
    for ((dst, l), r) in params.dst.iter_mut().zip(l).zip(r) {
        *dst = f(l, r);
    }
}

/// Compose every operand pair.
pub fn transform_mul_loop(params: &mut TransformMulParams, normalize: bool) {
    if normalize {
        mul_with(params, mul_transforms_normalized);
    } else {
        mul_with(params, mul_transforms);
    }
}

/// Inputs and output buffer for rotate-then-renormalize.
#[derive(Debug, Clone)]
pub struct RotateAxisParams {
    /// Results.
    pub dst: Vec<Transform>,
    /// Starting transforms.
    pub src: Vec<Transform>,
    /// Unit rotation axes.
    pub axis: Vec<Vec3>,
    /// Angles in radians.
    pub angle: Vec<f32>,
}

impl RotateAxisParams {
    /// `count` random rotations.
    pub fn random(rng: &mut StdRng, count: usize) -> Self {
        Self {
            dst: vec![Transform::IDENTITY; count],
            src: random_transform_array(rng, count),
            axis: random_axis_array(rng, count),
            angle: random_array(rng, count),
        }
    }
}

#[inline(never)]
fn rotate_axis_with<F>(params: &mut RotateAxisParams, renormalize: F)
where
    F: Fn(Quat) -> Quat,
{
    let inputs = params.src.iter().zip(&params.axis).zip(&params.angle);
    for (dst, ((src, &axis), &angle)) in params.dst.iter_mut().zip(inputs) {
        *dst = *src;
        dst.rotate_axis(axis, angle);
        dst.rotation = renormalize(dst.rotation);
    }
}

/// Rotate every transform, then renormalize with `mode`.
pub fn rotate_axis_loop(params: &mut RotateAxisParams, mode: Renormalize) {
    match mode {
        Renormalize::Never => rotate_axis_with(params, |q| q),
        Renormalize::Always => rotate_axis_with(params, Quat::normalize),
        Renormalize::Reactive => rotate_axis_with(params, reactive_renormalize),
        Renormalize::Fast => rotate_axis_with(params, fast_renormalize),
    }
}

/// Inputs and output buffer for renormalization alone.
#[derive(Debug, Clone)]
pub struct SingleNormalizeParams {
    /// Results.
    pub dst: Vec<Transform>,
    /// Transforms whose rotation is renormalized.
    pub src: Vec<Transform>,
}

impl SingleNormalizeParams {
    /// `count` random transforms.
    pub fn random(rng: &mut StdRng, count: usize) -> Self {
        Self {
            dst: vec![Transform::IDENTITY; count],
            src: random_transform_array(rng, count),
        }
    }
}

#[inline(never)]
fn single_normalize_with<F>(params: &mut SingleNormalizeParams, renormalize: F)
where
    F: Fn(Quat) -> Quat,
{
    for (dst, src) in params.dst.iter_mut().zip(&params.src) {
        dst.rotation = renormalize(src.rotation);
    }
}

/// Renormalize every rotation with `mode`.
pub fn single_normalize_loop(params: &mut SingleNormalizeParams, mode: Renormalize) {
    match mode {
        Renormalize::Never => single_normalize_with(params, |q| q),
        Renormalize::Always => single_normalize_with(params, Quat::normalize),
        Renormalize::Reactive => single_normalize_with(params, reactive_renormalize),
        Renormalize::Fast => single_normalize_with(params, fast_renormalize),
    }
}

/// Register the `transform_normalize` cases.
pub fn transform_normalize(group: &mut BenchmarkGroup) {
    const COUNT: usize = l1_sized_count::<(Transform, Transform, Transform)>();
    group.throughput(Throughput::Elements(COUNT as u64));

    let params = TransformMulParams::random(&mut StdRng::seed_from_u64(1234), COUNT);
    for normalize in [false, true] {
        let mut params = params.clone();
        group.bench_function(format!("count = {COUNT}, normalize = {normalize}"), move |b| {
            b.iter(|| transform_mul_loop(&mut params, normalize))
        });
    }
}

/// Register the `rotate_axis_normalize` cases.
pub fn rotate_axis_normalize(group: &mut BenchmarkGroup) {
    const COUNT: usize = l1_sized_count::<(Transform, Transform, Vec3, f32)>();
    group.throughput(Throughput::Elements(COUNT as u64));

    let params = RotateAxisParams::random(&mut StdRng::seed_from_u64(1234), COUNT);
    for mode in Renormalize::ALL {
        let mut params = params.clone();
        group.bench_function(
            format!("count = {COUNT}, normalize = {}", mode.label()),
            move |b| b.iter(|| rotate_axis_loop(&mut params, mode)),
        );
    }
}

/// Register the `single_normalize` cases.
pub fn single_normalize(group: &mut BenchmarkGroup) {
    const COUNT: usize = l1_sized_count::<(Transform, Transform)>();
    group.throughput(Throughput::Elements(COUNT as u64));

    let params = SingleNormalizeParams::random(&mut StdRng::seed_from_u64(1234), COUNT);
    for mode in Renormalize::ALL {
        let mut params = params.clone();
        group.bench_function(
            format!("count = {COUNT}, normalize = {}", mode.label()),
            move |b| b.iter(|| single_normalize_loop(&mut params, mode)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Quat, b: Quat, tolerance: f32) -> bool {
        a.abs_diff_eq(b, tolerance)
    }

    #[test]
    fn point_transform_applies_scale_rotation_translation() {
        let t = Transform {
            translation: Vec3::new(1.0, 0.0, 0.0),
            rotation: Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
            scale: Vec3::splat(2.0),
        };
        let p = t.transform_point(Vec3::X);
        assert!(p.abs_diff_eq(Vec3::new(1.0, 2.0, 0.0), 1e-5));
    }

    #[test]
    fn composition_matches_sequential_application() {
        let mut rng = StdRng::seed_from_u64(3);
        let params = TransformMulParams::random(&mut rng, 8);
        let [l, r] = &params.src;
        for (l, r) in l.iter().zip(r) {
            let point = Vec3::new(0.5, -1.0, 2.0);
            let composed = mul_transforms(l, r).transform_point(point);
            let sequential = l.transform_point(r.transform_point(point));
            assert!(composed.abs_diff_eq(sequential, 1e-4));
        }
    }

    #[test]
    fn renormalize_strategies_agree_near_unit_length() {
        let mut rng = StdRng::seed_from_u64(11);
        for t in random_transform_array(&mut rng, 64) {
            let drifted = t.rotation * 1.001;
            let exact = drifted.normalize();
            for mode in [Renormalize::Always, Renormalize::Reactive, Renormalize::Fast] {
                assert!(close(mode.apply(drifted), exact, 1e-5), "{mode:?}");
            }
        }
    }

    #[test]
    fn reactive_leaves_small_drift_alone() {
        let q = Quat::IDENTITY * 1.00001;
        assert_eq!(reactive_renormalize(q), q);
        let far = Quat::IDENTITY * 1.1;
        assert!((reactive_renormalize(far).length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rotate_axis_loop_renormalizes() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut params = RotateAxisParams::random(&mut rng, 128);
        for t in &mut params.src {
            t.rotation = t.rotation * 1.01;
        }

        let mut exact = params.clone();
        rotate_axis_loop(&mut exact, Renormalize::Always);
        assert!(exact.dst.iter().all(|t| t.rotation.is_normalized()));

        for mode in [Renormalize::Reactive, Renormalize::Fast] {
            let mut other = params.clone();
            rotate_axis_loop(&mut other, mode);
            for (a, b) in other.dst.iter().zip(&exact.dst) {
                assert!(close(a.rotation, b.rotation, 1e-3), "{mode:?}");
            }
        }
    }

    #[test]
    fn mul_loop_fills_every_slot() {
        let mut params = TransformMulParams::random(&mut StdRng::seed_from_u64(9), 16);
        transform_mul_loop(&mut params, true);
        assert!(params.dst.iter().all(|t| t.rotation.is_normalized()));
        assert!(params.dst.iter().all(|t| *t != Transform::IDENTITY));
    }

    #[test]
    fn single_normalize_only_writes_rotation() {
        let mut params = SingleNormalizeParams::random(&mut StdRng::seed_from_u64(2), 16);
        single_normalize_loop(&mut params, Renormalize::Fast);
        for (dst, src) in params.dst.iter().zip(&params.src) {
            assert_eq!(dst.translation, Vec3::ZERO);
            assert!(close(dst.rotation, src.rotation, 1e-5));
        }
    }

    #[test]
    fn groups_name_cases_by_strategy() {
        let mut group = BenchmarkGroup::new("rotate_axis_normalize");
        rotate_axis_normalize(&mut group);
        let names: Vec<&str> = group.cases().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names.len(), 4);
        assert!(names[2].ends_with("normalize = reactive"));

        let mut group = BenchmarkGroup::new("transform_normalize");
        transform_normalize(&mut group);
        let count = l1_sized_count::<(Transform, Transform, Transform)>();
        assert_eq!(group.cases()[0].name, format!("count = {count}, normalize = false"));
        assert_eq!(group.cases()[0].throughput, Some(Throughput::Elements(count as u64)));
    }
}
