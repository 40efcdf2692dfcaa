//! Shading-time reconstruction of indirect irradiance from the probe fields.
//!
//! For a world position the eight probes of the surrounding grid cell are
//! weighted by trilinear position, back-face rejection and a Chebyshev
//! visibility test against their distance moments, then their irradiance
//! at the surface normal is blended.

use glam::{UVec3, Vec3};
use irradia_core::constants::{COINCIDENT_PROBE_DISTANCE, MIN_VISIBILITY_WEIGHT, MIN_WEIGHT_SUM};
use irradia_core::math::decode_irradiance;
use irradia_core::octahedral::octahedral_encode;
use irradia_core::VolumeDesc;

use crate::field::ProbeField;

/// A surface point to shade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadingPoint {
    pub position: Vec3,
    /// Unit surface normal.
    pub normal: Vec3,
    /// Unit direction from the camera (or ray origin) towards the point.
    pub view_dir: Vec3,
}

/// How one cage probe contributed to a sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProbeContribution {
    pub coords: UVec3,
    pub trilinear: f32,
    /// 0 when the probe lies behind the surface, else 1.
    pub backface: f32,
    pub visibility: f32,
    /// Final normalized weight.
    pub weight: f32,
    /// Decoded irradiance the probe stores for the surface normal.
    pub irradiance: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndirectSample {
    pub irradiance: Vec3,
    pub contributions: [ProbeContribution; 8],
    /// Every visibility-aware weight was zero; trilinear weights were used.
    pub trilinear_fallback: bool,
}

/// Read-only view of a probe volume for shading queries.
#[derive(Debug, Clone, Copy)]
pub struct IndirectLightSampler<'a> {
    desc: &'a VolumeDesc,
    irradiance: &'a ProbeField,
    distance: &'a ProbeField,
}

impl<'a> IndirectLightSampler<'a> {
    pub fn new(desc: &'a VolumeDesc, irradiance: &'a ProbeField, distance: &'a ProbeField) -> Self {
        Self {
            desc,
            irradiance,
            distance,
        }
    }

    /// Indirect irradiance at `point`.
    pub fn sample(&self, point: &ShadingPoint) -> Vec3 {
        self.sample_detailed(point).irradiance
    }

    /// Indirect irradiance at `point` together with per-probe weights.
    pub fn sample_detailed(&self, point: &ShadingPoint) -> IndirectSample {
        let desc = self.desc;
        let biased = point.position + point.normal * desc.probe_normal_bias
            - point.view_dir * desc.probe_view_bias;

        let base = desc.base_probe_coords(biased);
        let base_position = desc.world_position_from_coords(base);
        let alpha = ((biased - base_position) / desc.probe_spacing).clamp(Vec3::ZERO, Vec3::ONE);
        let max_coords = desc.probe_counts - UVec3::ONE;

        let mut contributions = [ProbeContribution::default(); 8];
        let mut weight_sum = 0.0;
        for (corner, contribution) in contributions.iter_mut().enumerate() {
            let offset = UVec3::new(corner as u32 & 1, (corner as u32 >> 1) & 1, (corner as u32 >> 2) & 1);
            let coords = (base + offset).min(max_coords);
            let probe_position = desc.world_position_from_coords(coords);

            let t = Vec3::select(offset.cmpeq(UVec3::ONE), alpha, Vec3::ONE - alpha);
            let trilinear = t.x * t.y * t.z;
            let backface = backface_weight(point.position, point.normal, probe_position);
            let visibility = self.visibility_weight(coords, probe_position, biased);

            let encoded = self
                .irradiance
                .sample_block(coords, octahedral_encode(point.normal))
                .truncate();
            let weight = trilinear * backface * visibility;
            weight_sum += weight;
            *contribution = ProbeContribution {
                coords,
                trilinear,
                backface,
                visibility,
                weight,
                irradiance: decode_irradiance(encoded, desc.probe_irradiance_encoding_gamma),
            };
        }

        let trilinear_fallback = weight_sum < MIN_WEIGHT_SUM;
        if trilinear_fallback {
            weight_sum = 0.0;
            for contribution in contributions.iter_mut() {
                contribution.weight = contribution.trilinear;
                weight_sum += contribution.weight;
            }
        }

        let mut irradiance = Vec3::ZERO;
        for contribution in contributions.iter_mut() {
            contribution.weight /= weight_sum;
            irradiance += contribution.irradiance * contribution.weight;
        }

        IndirectSample {
            irradiance,
            contributions,
            trilinear_fallback,
        }
    }

    /// Chebyshev upper bound on the probe seeing `biased` given its stored
    /// distance mean and variance in that direction.
    fn visibility_weight(&self, coords: UVec3, probe_position: Vec3, biased: Vec3) -> f32 {
        let probe_to_point = biased - probe_position;
        let distance = probe_to_point.length();
        if distance < COINCIDENT_PROBE_DISTANCE {
            return 1.0;
        }
        let moments = self
            .distance
            .sample_block(coords, octahedral_encode(probe_to_point / distance));
        let mean = moments.x;
        if distance <= mean {
            return 1.0;
        }
        let variance = (moments.y - mean * mean).abs();
        let delta = distance - mean;
        let chebyshev = variance / (variance + delta * delta);
        // Degenerate moments (variance 0) fall to the floor.
        if !chebyshev.is_finite() {
            return MIN_VISIBILITY_WEIGHT;
        }
        chebyshev.powi(3).max(MIN_VISIBILITY_WEIGHT)
    }
}

fn backface_weight(position: Vec3, normal: Vec3, probe_position: Vec3) -> f32 {
    let to_probe = probe_position - position;
    let length = to_probe.length();
    if length < COINCIDENT_PROBE_DISTANCE {
        return 1.0;
    }
    if (to_probe / length).dot(normal) < 0.0 {
        0.0
    } else {
        1.0
    }
}
