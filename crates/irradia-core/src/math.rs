use glam::{Vec2, Vec3, Vec4};

/// Perceptually encode linear irradiance for storage: `value^(1/gamma)`.
/// Negative components clamp to zero.
pub fn encode_irradiance(linear: Vec3, gamma: f32) -> Vec3 {
    linear.max(Vec3::ZERO).powf(1.0 / gamma)
}

/// Inverse of [`encode_irradiance`]: `value^gamma`.
pub fn decode_irradiance(encoded: Vec3, gamma: f32) -> Vec3 {
    encoded.max(Vec3::ZERO).powf(gamma)
}

/// Temporal blend: `computed * (1 - h) + stored * h`.
///
/// Written without the `a + (b - a) * t` form so that `h == 1.0` returns
/// `stored` bit-for-bit.
pub fn blend_hysteresis(computed: Vec4, stored: Vec4, hysteresis: f32) -> Vec4 {
    computed * (1.0 - hysteresis) + stored * hysteresis
}

/// Component-wise sign that maps 0 to +1.
pub fn sign_not_zero(v: Vec2) -> Vec2 {
    Vec2::new(
        if v.x >= 0.0 { 1.0 } else { -1.0 },
        if v.y >= 0.0 { 1.0 } else { -1.0 },
    )
}

/// Fractional part for non-negative inputs.
pub fn fract(x: f32) -> f32 {
    x - x.floor()
}
