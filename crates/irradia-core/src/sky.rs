//! Radiance returned by probe rays that miss all geometry.
//! A two-color gradient with a squared falloff towards the zenith:
//! `t = (dir.y * 0.5 + 0.5)^2`, `L = lerp(horizon, zenith, t) * intensity`.

use glam::Vec3;
use serde::Deserialize;

/// Default sky zenith color (deep blue, looking straight up).
pub const DEFAULT_SKY_ZENITH: [f32; 3] = [0.1, 0.15, 0.4];

/// Default sky horizon color (warm haze at the horizon).
pub const DEFAULT_SKY_HORIZON: [f32; 3] = [0.5, 0.45, 0.35];

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SkyModel {
    pub zenith: Vec3,
    pub horizon: Vec3,
    pub intensity: f32,
}

impl Default for SkyModel {
    fn default() -> Self {
        Self {
            zenith: Vec3::from_array(DEFAULT_SKY_ZENITH),
            horizon: Vec3::from_array(DEFAULT_SKY_HORIZON),
            intensity: 1.0,
        }
    }
}

impl SkyModel {
    /// A sky that returns `color` in every direction.
    pub fn uniform(color: Vec3) -> Self {
        Self {
            zenith: color,
            horizon: color,
            intensity: 1.0,
        }
    }

    /// No light from the sky; useful for closed interiors.
    pub fn black() -> Self {
        Self::uniform(Vec3::ZERO)
    }

    /// Radiance arriving from direction `dir` (unit, Y up).
    pub fn radiance(&self, dir: Vec3) -> Vec3 {
        let t = (dir.y * 0.5 + 0.5).clamp(0.0, 1.0);
        let t = t * t;
        self.horizon.lerp(self.zenith, t) * self.intensity
    }
}
