//! Per-slot probe ray directions.
//!
//! Slot `i` of `n` always starts from the same spherical Fibonacci point;
//! the per-cycle random rotation is applied on top. Tracing and update both
//! call [`probe_ray_direction`] so slot `i` means the same direction in
//! both stages.

use glam::{Quat, Vec3};

use crate::constants::GOLDEN_RATIO_FRACT;
use crate::math::fract;

/// Point `index` of an `count`-point spherical Fibonacci set.
/// Deterministic, evenly spread over the whole sphere.
pub fn spherical_fibonacci(index: u32, count: u32) -> Vec3 {
    let i = index as f32;
    let phi = std::f32::consts::TAU * fract(i * GOLDEN_RATIO_FRACT);
    let cos_theta = 1.0 - (2.0 * i + 1.0) / count as f32;
    let sin_theta = (1.0 - cos_theta * cos_theta).clamp(0.0, 1.0).sqrt();
    Vec3::new(phi.cos() * sin_theta, phi.sin() * sin_theta, cos_theta)
}

/// World-space direction of ray slot `index` for the current cycle.
pub fn probe_ray_direction(index: u32, count: u32, rotation: Quat) -> Vec3 {
    (rotation * spherical_fibonacci(index, count)).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fibonacci_points_are_unit() {
        for i in 0..100 {
            let d = spherical_fibonacci(i, 100);
            assert!((d.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_fibonacci_covers_sphere() {
        let n = 256;
        let mean: Vec3 = (0..n).map(|i| spherical_fibonacci(i, n)).sum::<Vec3>() / n as f32;
        assert!(mean.length() < 0.05, "mean direction {mean} should be near zero");
        let up = (0..n).filter(|&i| spherical_fibonacci(i, n).z > 0.0).count();
        assert_eq!(up, n as usize / 2);
    }

    #[test]
    fn test_single_ray_is_on_equator() {
        let d = spherical_fibonacci(0, 1);
        assert!(d.z.abs() < 1e-6);
    }

    #[test]
    fn test_rotation_is_applied() {
        let rotation = Quat::from_rotation_x(std::f32::consts::FRAC_PI_2);
        for i in 0..8 {
            let base = spherical_fibonacci(i, 8);
            let d = probe_ray_direction(i, 8, rotation);
            assert!((d - rotation * base).length() < 1e-5);
        }
    }
}
