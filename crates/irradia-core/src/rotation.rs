//! Per-cycle random ray rotation.
//!
//! Uniform over SO(3) using Arvo's construction (Graphics Gems III,
//! pp. 117-120) from three uniform variates, stored as a unit quaternion.
//! Exactly one rotation is drawn per update cycle and handed to both the
//! tracer and the updater.

use glam::{Mat3, Quat, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Build a rotation matrix from three variates in `[0, 1)`.
///
/// `u1` and `u2` become angles; `u3` places the rotated pole.
pub fn arvo_rotation(u1: f32, u2: f32, u3: f32) -> Mat3 {
    let theta = std::f32::consts::TAU * u1;
    let (sin1, cos1) = theta.sin_cos();

    let phi = std::f32::consts::TAU * u2;
    let (sin2, cos2) = phi.sin_cos();

    let sq3 = 2.0 * (u3 * (1.0 - u3)).sqrt();

    let s2 = 2.0 * u3 * sin2 * sin2 - 1.0;
    let c2 = 2.0 * u3 * cos2 * cos2 - 1.0;
    let sc = 2.0 * u3 * sin2 * cos2;

    Mat3::from_cols(
        Vec3::new(cos1 * c2 - sin1 * sc, sin1 * c2 + cos1 * sc, sq3 * cos2),
        Vec3::new(cos1 * sc - sin1 * s2, sin1 * sc + cos1 * s2, sq3 * sin2),
        Vec3::new(
            cos1 * (sq3 * cos2) - sin1 * (sq3 * sin2),
            sin1 * (sq3 * cos2) + cos1 * (sq3 * sin2),
            1.0 - 2.0 * u3,
        ),
    )
}

/// Convert an orthonormal rotation matrix to a unit quaternion.
///
/// Picks the branch whose divisor is the largest of `w`, `x`, `y`, `z`:
/// positive trace first, otherwise the dominant diagonal term.
pub fn quat_from_rotation_matrix(m: Mat3) -> Quat {
    // m[r][c] in row/column notation.
    let m00 = m.x_axis.x;
    let m10 = m.x_axis.y;
    let m20 = m.x_axis.z;
    let m01 = m.y_axis.x;
    let m11 = m.y_axis.y;
    let m21 = m.y_axis.z;
    let m02 = m.z_axis.x;
    let m12 = m.z_axis.y;
    let m22 = m.z_axis.z;

    let trace = m00 + m11 + m22;

    let (x, y, z, w) = if trace > 0.0 {
        let w = (trace + 1.0).sqrt() * 0.5;
        let f = 0.25 / w;
        ((m21 - m12) * f, (m02 - m20) * f, (m10 - m01) * f, w)
    } else if m00 > m11 && m00 > m22 {
        let x = (m00 - m11 - m22 + 1.0).sqrt() * 0.5;
        let f = 0.25 / x;
        (x, (m01 + m10) * f, (m02 + m20) * f, (m21 - m12) * f)
    } else if m11 > m22 {
        let y = (m11 - m00 - m22 + 1.0).sqrt() * 0.5;
        let f = 0.25 / y;
        ((m01 + m10) * f, y, (m12 + m21) * f, (m02 - m20) * f)
    } else {
        let z = (m22 - m00 - m11 + 1.0).sqrt() * 0.5;
        let f = 0.25 / z;
        ((m02 + m20) * f, (m12 + m21) * f, z, (m10 - m01) * f)
    };

    Quat::from_xyzw(x, y, z, w).normalize()
}

/// Draws one uniformly random rotation per update cycle.
#[derive(Debug)]
pub struct RandomRotationGenerator<R: Rng = StdRng> {
    rng: R,
}

impl RandomRotationGenerator<StdRng> {
    /// Deterministic generator, for reproducible captures and tests.
    pub fn from_seed(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Generator seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> RandomRotationGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Draw the rotation matrix for the next cycle.
    pub fn next_matrix(&mut self) -> Mat3 {
        let u1: f32 = self.rng.gen();
        let u2: f32 = self.rng.gen();
        let u3: f32 = self.rng.gen();
        arvo_rotation(u1, u2, u3)
    }

    /// Draw the rotation for the next cycle as a unit quaternion.
    pub fn next_rotation(&mut self) -> Quat {
        quat_from_rotation_matrix(self.next_matrix())
    }
}
