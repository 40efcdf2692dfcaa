use glam::{Mat4, Quat, UVec3, Vec3};
use serde::Deserialize;

use crate::constants::*;
use crate::error::ConfigError;
use crate::types::{FieldKind, FieldLayout, GridLayout, ProbeCoord, TextureExtent};

/// Immutable description of a DDGI probe volume.
///
/// Probes form a regular `probe_counts` grid centered on `origin`. Probe
/// indices run X fastest, then Z, then Y (Y is up and iterates slowest), and
/// every buffer in the pipeline is addressed through that order.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct VolumeDesc {
    /// World-space center of the grid.
    pub origin: Vec3,
    /// Distance between neighboring probes on each axis.
    pub probe_spacing: Vec3,
    /// Probes per axis.
    pub probe_counts: UVec3,
    /// Default scale for debug probe instances.
    pub probe_visualization_scale: Vec3,
    /// Rays per probe per update cycle.
    pub probe_num_rays: u32,
    /// Irradiance block interior resolution (border excluded).
    pub probe_num_irradiance_interior_texels: u32,
    /// Distance block interior resolution (border excluded).
    pub probe_num_distance_interior_texels: u32,
    /// Fraction of the previous field value kept each cycle.
    pub probe_hysteresis: f32,
    /// Ray cutoff; misses report this distance.
    pub probe_max_ray_distance: f32,
    /// Shading-point offset along the surface normal.
    pub probe_normal_bias: f32,
    /// Shading-point offset towards the camera.
    pub probe_view_bias: f32,
    /// Stored irradiance is `value^(1/gamma)`.
    pub probe_irradiance_encoding_gamma: f32,
    /// Exponent on the cosine weight used for the distance blend.
    pub probe_distance_exponent: f32,
    /// Feed the previous irradiance field back into ray hits.
    pub probe_indirect_bounce: bool,
}

impl Default for VolumeDesc {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            probe_spacing: Vec3::splat(2.0),
            probe_counts: UVec3::new(8, 4, 8),
            probe_visualization_scale: Vec3::splat(0.2),
            probe_num_rays: DEFAULT_PROBE_NUM_RAYS,
            probe_num_irradiance_interior_texels: DEFAULT_IRRADIANCE_INTERIOR_TEXELS,
            probe_num_distance_interior_texels: DEFAULT_DISTANCE_INTERIOR_TEXELS,
            probe_hysteresis: DEFAULT_PROBE_HYSTERESIS,
            probe_max_ray_distance: DEFAULT_PROBE_MAX_RAY_DISTANCE,
            probe_normal_bias: DEFAULT_PROBE_NORMAL_BIAS,
            probe_view_bias: DEFAULT_PROBE_VIEW_BIAS,
            probe_irradiance_encoding_gamma: DEFAULT_IRRADIANCE_ENCODING_GAMMA,
            probe_distance_exponent: DEFAULT_PROBE_DISTANCE_EXPONENT,
            probe_indirect_bounce: true,
        }
    }
}

impl VolumeDesc {
    /// Reject descriptors that would divide by zero, index out of range or
    /// produce empty resources.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.probe_counts.min_element() == 0 {
            return Err(ConfigError::InvalidProbeCounts(self.probe_counts));
        }
        if !self.origin.is_finite() {
            return Err(ConfigError::NonFiniteOrigin(self.origin));
        }
        if !self.probe_spacing.is_finite() || self.probe_spacing.min_element() <= 0.0 {
            return Err(ConfigError::NonPositiveSpacing(self.probe_spacing));
        }
        if self.probe_num_rays == 0 {
            return Err(ConfigError::ZeroRayCount);
        }
        if self.probe_num_irradiance_interior_texels == 0 {
            return Err(ConfigError::ZeroInteriorTexels {
                field: "probe_num_irradiance_interior_texels",
            });
        }
        if self.probe_num_distance_interior_texels == 0 {
            return Err(ConfigError::ZeroInteriorTexels {
                field: "probe_num_distance_interior_texels",
            });
        }
        self.validate_extents()?;
        if !(0.0..=1.0).contains(&self.probe_hysteresis) {
            return Err(ConfigError::HysteresisOutOfRange(self.probe_hysteresis));
        }
        for (field, value) in [
            ("probe_max_ray_distance", self.probe_max_ray_distance),
            (
                "probe_irradiance_encoding_gamma",
                self.probe_irradiance_encoding_gamma,
            ),
            ("probe_distance_exponent", self.probe_distance_exponent),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositive { field, value });
            }
        }
        for (field, value) in [
            ("probe_normal_bias", self.probe_normal_bias),
            ("probe_view_bias", self.probe_view_bias),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::NegativeBias { field, value });
            }
        }
        Ok(())
    }

    /// Every count and extent derived from the grid must fit a `u32`, since
    /// indices and texture sizes are computed in 32 bits on both backends.
    fn validate_extents(&self) -> Result<(), ConfigError> {
        let counts = self.probe_counts;
        let probes = counts
            .x
            .checked_mul(counts.z)
            .and_then(|layer| layer.checked_mul(counts.y))
            .ok_or(ConfigError::GridTooLarge {
                what: "probe count",
            })?;
        probes
            .checked_mul(self.probe_num_rays)
            .ok_or(ConfigError::GridTooLarge {
                what: "rays per cycle",
            })?;
        for (what, interior_texels) in [
            (
                "irradiance field extent",
                self.probe_num_irradiance_interior_texels,
            ),
            (
                "distance field extent",
                self.probe_num_distance_interior_texels,
            ),
        ] {
            interior_texels
                .checked_add(2 * PROBE_BORDER_TEXELS)
                .and_then(|block| {
                    counts.x.checked_mul(block)?;
                    counts.z.checked_mul(block)
                })
                .ok_or(ConfigError::GridTooLarge { what })?;
        }
        Ok(())
    }

    /// Total number of probes.
    pub fn probe_count(&self) -> u32 {
        self.probe_counts.x * self.probe_counts.y * self.probe_counts.z
    }

    /// Probes in one horizontal (XZ) layer.
    pub fn probes_per_layer(&self) -> u32 {
        self.probe_counts.x * self.probe_counts.z
    }

    /// Grid coordinate of probe `index`. `index` must be below `probe_count()`.
    pub fn coords_from_index(&self, index: u32) -> ProbeCoord {
        debug_assert!(index < self.probe_count(), "probe index {index} out of range");
        let counts = self.probe_counts;
        UVec3::new(
            index % counts.x,
            index / (counts.x * counts.z),
            (index / counts.x) % counts.z,
        )
    }

    /// Inverse of [`Self::coords_from_index`].
    pub fn index_from_coords(&self, coords: ProbeCoord) -> u32 {
        let counts = self.probe_counts;
        coords.x + coords.z * counts.x + coords.y * counts.x * counts.z
    }

    /// Index of the probe within its XZ layer; the row of its ray data.
    pub fn layer_index_from_coords(&self, coords: ProbeCoord) -> u32 {
        coords.x + coords.z * self.probe_counts.x
    }

    /// World-space position of the probe at `coords`. The grid is centered
    /// on `origin`.
    pub fn world_position_from_coords(&self, coords: ProbeCoord) -> Vec3 {
        let grid_position = self.probe_spacing * coords.as_vec3();
        let grid_shift = self.probe_spacing * (self.probe_counts.as_vec3() - Vec3::ONE) * 0.5;
        self.origin + grid_position - grid_shift
    }

    /// Translation + scale transform for drawing the probe at `coords`.
    /// Probes are not oriented, so the rotation is always identity.
    pub fn world_matrix_from_coords(&self, coords: ProbeCoord, scale: Vec3) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            scale,
            Quat::IDENTITY,
            self.world_position_from_coords(coords),
        )
    }

    /// World position of the grid's minimum corner probe.
    pub fn grid_min(&self) -> Vec3 {
        self.world_position_from_coords(UVec3::ZERO)
    }

    /// The probe at the minimum corner of the cell containing `position`,
    /// clamped into the grid.
    pub fn base_probe_coords(&self, position: Vec3) -> ProbeCoord {
        let relative = (position - self.grid_min()) / self.probe_spacing;
        let max = (self.probe_counts - UVec3::ONE).as_vec3();
        relative.floor().clamp(Vec3::ZERO, max).as_uvec3()
    }

    /// Resource extents implied by this descriptor.
    pub fn layout(&self) -> GridLayout {
        let counts = self.probe_counts;
        let field = |kind: FieldKind, interior_texels: u32| {
            let block = interior_texels + 2 * PROBE_BORDER_TEXELS;
            FieldLayout {
                kind,
                interior_texels,
                extent: TextureExtent::new(counts.x * block, counts.z * block, counts.y),
            }
        };
        GridLayout {
            probe_counts: counts,
            num_rays: self.probe_num_rays,
            ray_data: TextureExtent::new(self.probe_num_rays, self.probes_per_layer(), counts.y),
            irradiance: field(
                FieldKind::Irradiance,
                self.probe_num_irradiance_interior_texels,
            ),
            distance: field(FieldKind::Distance, self.probe_num_distance_interior_texels),
        }
    }
}
