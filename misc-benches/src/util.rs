//! Sizing and random input helpers shared by the benchmarks.

use crate::transform::Transform;
use glam::Vec3;
use rand::Rng;
use rand::distributions::{Distribution, Standard};
use std::f32::consts::TAU;

/// How many values of `T` fit comfortably in a 16 KiB L1 data cache.
pub const fn l1_sized_count<T>() -> usize {
    (16 * 1024) / std::mem::size_of::<T>()
}

/// How many values of `T` fit comfortably in a 512 KiB L2 cache.
pub const fn l2_sized_count<T>() -> usize {
    (512 * 1024) / std::mem::size_of::<T>()
}

/// `count` values drawn from the standard distribution of `T`.
pub fn random_array<T, R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<T>
where
    Standard: Distribution<T>,
{
    Standard.sample_iter(rng).take(count).collect()
}

/// `count` pure rotations, identity translation and scale.
pub fn random_transform_array<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<Transform> {
    Standard
        .sample_iter(rng)
        .map(Transform::from_rotation)
        .take(count)
        .collect()
}

/// A direction drawn uniformly from the unit sphere.
pub fn random_axis<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    let z = rng.gen_range(-1.0f32..=1.0);
    let (s, c) = rng.gen_range(0.0f32..TAU).sin_cos();
    let r = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(r * c, r * s, z)
}

/// `count` unit directions.
pub fn random_axis_array<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<Vec3> {
    std::iter::repeat_with(|| random_axis(rng))
        .take(count)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn cache_sized_counts() {
        assert_eq!(l1_sized_count::<u8>(), 16 * 1024);
        assert_eq!(l1_sized_count::<f32>(), 4096);
        assert_eq!(l1_sized_count::<(Quat, Quat, Quat)>(), 341);
        assert_eq!(l2_sized_count::<f32>(), 128 * 1024);
        assert_eq!(l2_sized_count::<(Quat, Quat, Quat)>(), 10922);
    }

    #[test]
    fn seeded_arrays_repeat() {
        let a: Vec<f32> = random_array(&mut StdRng::seed_from_u64(1234), 64);
        let b: Vec<f32> = random_array(&mut StdRng::seed_from_u64(1234), 64);
        assert_eq!(a, b);
        assert!(a.iter().all(|t| (0.0..1.0).contains(t)));
    }

    #[test]
    fn transforms_are_pure_rotations() {
        let mut rng = StdRng::seed_from_u64(7);
        for t in random_transform_array(&mut rng, 32) {
            assert_eq!(t.translation, Vec3::ZERO);
            assert_eq!(t.scale, Vec3::ONE);
            assert!((t.rotation.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn axes_are_unit_length() {
        let mut rng = StdRng::seed_from_u64(7);
        let axes = random_axis_array(&mut rng, 256);
        assert_eq!(axes.len(), 256);
        assert!(axes.iter().all(|a| (a.length() - 1.0).abs() < 1e-5));
    }
}
