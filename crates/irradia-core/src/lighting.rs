use glam::Vec3;
use serde::Deserialize;

/// The main directional light used for direct lighting at probe ray hits.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct DirectionalLight {
    /// Unit direction from a surface towards the light.
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(0.3, 1.0, 0.2).normalize(),
            color: Vec3::new(1.0, 0.95, 0.8),
            intensity: 1.5,
        }
    }
}

impl DirectionalLight {
    pub fn new(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            direction: direction.normalize_or_zero(),
            color,
            intensity,
        }
    }

    /// A light that contributes nothing.
    pub fn off() -> Self {
        Self {
            intensity: 0.0,
            ..Self::default()
        }
    }

    /// Irradiance scale: color times intensity.
    pub fn radiance(&self) -> Vec3 {
        self.color * self.intensity
    }
}
