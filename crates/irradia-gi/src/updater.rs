use glam::{Quat, UVec2, UVec3, Vec3, Vec4};
use irradia_core::constants::MIN_WEIGHT_SUM;
use irradia_core::math::{blend_hysteresis, encode_irradiance};
use irradia_core::octahedral::interior_texel_direction;
use irradia_core::sampling::probe_ray_direction;
use irradia_core::{FieldKind, VolumeDesc};
use rayon::prelude::*;

use crate::error::GiError;
use crate::field::{fill_block_border, ProbeField};
use crate::ray_data::{RayDataBuffer, RayRecord};

/// Folds one cycle of ray data into the irradiance and distance fields.
pub struct ProbeFieldUpdater<'a> {
    desc: &'a VolumeDesc,
}

impl<'a> ProbeFieldUpdater<'a> {
    pub fn new(desc: &'a VolumeDesc) -> Self {
        Self { desc }
    }

    /// Update both fields. `rotation` must be the one the rays were traced
    /// with so slot directions line up.
    pub fn update(
        &self,
        rotation: Quat,
        rays: &RayDataBuffer,
        irradiance: &mut ProbeField,
        distance: &mut ProbeField,
    ) -> Result<(), GiError> {
        self.check_layouts(rays, irradiance, distance)?;
        let directions = self.ray_directions(rotation);
        self.update_field(&directions, rays, irradiance);
        self.update_field(&directions, rays, distance);
        Ok(())
    }

    /// Update a single field.
    pub fn update_field(&self, directions: &[Vec3], rays: &RayDataBuffer, field: &mut ProbeField) {
        let desc = self.desc;
        let kind = field.kind();
        let n = field.interior_texels();
        let hysteresis = desc.probe_hysteresis;
        let stored: &ProbeField = field;

        let blocks: Vec<(UVec3, Vec<Vec4>)> = (0..desc.probe_count())
            .into_par_iter()
            .map(|index| {
                let coords = desc.coords_from_index(index);
                let probe_rays = rays.probe_rays(coords, desc.probe_counts);
                let side = n + 2;
                let mut block = stored.read_block(coords);
                for y in 0..n {
                    for x in 0..n {
                        let texel_dir = interior_texel_direction(UVec2::new(x, y), n);
                        let computed = match kind {
                            FieldKind::Irradiance => self.irradiance_texel(texel_dir, directions, probe_rays),
                            FieldKind::Distance => self.distance_texel(texel_dir, directions, probe_rays),
                        };
                        let slot = ((y + 1) * side + x + 1) as usize;
                        block[slot] = blend_hysteresis(computed, block[slot], hysteresis);
                    }
                }
                fill_block_border(&mut block, n);
                (coords, block)
            })
            .collect();

        for (coords, block) in &blocks {
            field.write_block(*coords, block);
        }
        log::trace!("Updated {} for {} probes", kind.label(), blocks.len());
    }

    /// This cycle's world-space direction per ray slot.
    pub fn ray_directions(&self, rotation: Quat) -> Vec<Vec3> {
        let count = self.desc.probe_num_rays;
        (0..count)
            .map(|slot| probe_ray_direction(slot, count, rotation))
            .collect()
    }

    /// Cosine-weighted mean radiance around `texel_dir`, encoded.
    fn irradiance_texel(&self, texel_dir: Vec3, directions: &[Vec3], rays: &[RayRecord]) -> Vec4 {
        let mut sum = Vec3::ZERO;
        let mut weight_sum = 0.0;
        for (direction, ray) in directions.iter().zip(rays) {
            let weight = texel_dir.dot(*direction).max(0.0);
            sum += ray.radiance() * weight;
            weight_sum += weight;
        }
        let mean = if weight_sum >= MIN_WEIGHT_SUM {
            sum / weight_sum
        } else {
            rays.iter().map(RayRecord::radiance).sum::<Vec3>() / rays.len() as f32
        };
        encode_irradiance(mean, self.desc.probe_irradiance_encoding_gamma).extend(1.0)
    }

    /// Sharpened-cosine-weighted first and second moments of hit distance.
    fn distance_texel(&self, texel_dir: Vec3, directions: &[Vec3], rays: &[RayRecord]) -> Vec4 {
        let max_distance = self.desc.probe_max_ray_distance;
        let exponent = self.desc.probe_distance_exponent;
        let moments = |ray: &RayRecord| {
            let t = ray.distance.min(max_distance);
            Vec4::new(t, t * t, 0.0, 0.0)
        };

        let mut sum = Vec4::ZERO;
        let mut weight_sum = 0.0;
        for (direction, ray) in directions.iter().zip(rays) {
            let weight = texel_dir.dot(*direction).max(0.0).powf(exponent);
            sum += moments(ray) * weight;
            weight_sum += weight;
        }
        if weight_sum >= MIN_WEIGHT_SUM {
            sum / weight_sum
        } else {
            rays.iter().map(moments).sum::<Vec4>() / rays.len() as f32
        }
    }

    fn check_layouts(
        &self,
        rays: &RayDataBuffer,
        irradiance: &ProbeField,
        distance: &ProbeField,
    ) -> Result<(), GiError> {
        let expected = self.desc.layout();
        let mismatch = *rays.layout() != expected
            || *irradiance.layout() != expected.irradiance
            || *distance.layout() != expected.distance;
        if mismatch {
            return Err(GiError::LayoutMismatch {
                expected: Box::new(expected),
                actual: Box::new(*rays.layout()),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use irradia_core::math::decode_irradiance;
    use irradia_core::octahedral::octahedral_encode;

    fn desc(hysteresis: f32) -> VolumeDesc {
        VolumeDesc {
            probe_counts: UVec3::new(2, 2, 3),
            probe_num_rays: 64,
            probe_num_irradiance_interior_texels: 6,
            probe_num_distance_interior_texels: 8,
            probe_hysteresis: hysteresis,
            probe_max_ray_distance: 20.0,
            ..VolumeDesc::default()
        }
    }

    fn fields(desc: &VolumeDesc) -> (ProbeField, ProbeField) {
        let layout = desc.layout();
        (ProbeField::new(layout.irradiance), ProbeField::new(layout.distance))
    }

    fn constant_rays(desc: &VolumeDesc, radiance: Vec3, distance: f32) -> RayDataBuffer {
        let mut rays = RayDataBuffer::new(&desc.layout());
        for record in rays.records_mut() {
            *record = RayRecord::new(radiance, distance);
        }
        rays
    }

    /// Radiance varies with ray slot and probe so updates are not trivial.
    fn varied_rays(desc: &VolumeDesc) -> RayDataBuffer {
        let mut rays = RayDataBuffer::new(&desc.layout());
        let num_rays = desc.probe_num_rays as usize;
        for (i, record) in rays.records_mut().iter_mut().enumerate() {
            let slot = (i % num_rays) as f32;
            let probe = (i / num_rays) as f32;
            *record = RayRecord::new(Vec3::new(slot * 0.1, probe, 0.5), 1.0 + slot);
        }
        rays
    }

    #[test]
    fn test_zero_hysteresis_converges_to_constant_input() {
        let desc = desc(0.0);
        let (mut irradiance, mut distance) = fields(&desc);
        let radiance = Vec3::new(0.7, 0.3, 1.2);
        let rays = constant_rays(&desc, radiance, 6.0);
        ProbeFieldUpdater::new(&desc)
            .update(Quat::from_rotation_y(0.4), &rays, &mut irradiance, &mut distance)
            .expect("update");

        let gamma = desc.probe_irradiance_encoding_gamma;
        for texel in irradiance.texels() {
            let decoded = decode_irradiance(texel.truncate(), gamma);
            assert!((decoded - radiance).abs().max_element() < 1e-3, "{decoded}");
        }
        for texel in distance.texels() {
            assert!((texel.x - 6.0).abs() < 1e-3);
            assert!((texel.y - 36.0).abs() < 1e-2);
        }
    }

    #[test]
    fn test_full_hysteresis_keeps_previous_fields() {
        let first = desc(0.0);
        let (mut irradiance, mut distance) = fields(&first);
        ProbeFieldUpdater::new(&first)
            .update(Quat::IDENTITY, &varied_rays(&first), &mut irradiance, &mut distance)
            .expect("update");
        let before = (irradiance.clone(), distance.clone());

        let retain = desc(1.0);
        let rays = constant_rays(&retain, Vec3::splat(50.0), 0.5);
        ProbeFieldUpdater::new(&retain)
            .update(Quat::from_rotation_x(1.0), &rays, &mut irradiance, &mut distance)
            .expect("update");
        assert_eq!(irradiance, before.0);
        assert_eq!(distance, before.1);
    }

    #[test]
    fn test_partial_hysteresis_blends() {
        let desc = desc(0.75);
        let (mut irradiance, mut distance) = fields(&desc);
        let rays = constant_rays(&desc, Vec3::ONE, 8.0);
        ProbeFieldUpdater::new(&desc)
            .update(Quat::IDENTITY, &rays, &mut irradiance, &mut distance)
            .expect("update");
        // From zero: a quarter of the way there.
        for texel in distance.texels() {
            assert!((texel.x - 2.0).abs() < 1e-3);
        }
        for texel in irradiance.texels() {
            assert!((texel.x - 0.25).abs() < 1e-4);
        }
    }

    #[test]
    fn test_distances_clamp_to_max() {
        let desc = desc(0.0);
        let (mut irradiance, mut distance) = fields(&desc);
        let rays = constant_rays(&desc, Vec3::ONE, 1000.0);
        ProbeFieldUpdater::new(&desc)
            .update(Quat::IDENTITY, &rays, &mut irradiance, &mut distance)
            .expect("update");
        for texel in distance.texels() {
            assert!((texel.x - 20.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_single_ray_falls_back_to_unweighted_mean() {
        let mut desc = desc(0.0);
        desc.probe_num_rays = 1;
        let (mut irradiance, mut distance) = fields(&desc);
        let rays = constant_rays(&desc, Vec3::new(0.2, 0.4, 0.6), 3.0);
        ProbeFieldUpdater::new(&desc)
            .update(Quat::IDENTITY, &rays, &mut irradiance, &mut distance)
            .expect("update");
        let encoded = encode_irradiance(Vec3::new(0.2, 0.4, 0.6), desc.probe_irradiance_encoding_gamma);
        for texel in irradiance.texels() {
            assert!((texel.truncate() - encoded).abs().max_element() < 1e-5);
        }
        for texel in distance.texels() {
            assert!((texel.x - 3.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_directional_light_lands_on_matching_texels() {
        let mut desc = desc(0.0);
        desc.probe_num_rays = 256;
        let (mut irradiance, mut distance) = fields(&desc);
        let updater = ProbeFieldUpdater::new(&desc);
        let directions = updater.ray_directions(Quat::IDENTITY);
        let mut rays = RayDataBuffer::new(&desc.layout());
        let num_rays = desc.probe_num_rays as usize;
        for (i, record) in rays.records_mut().iter_mut().enumerate() {
            let bright = directions[i % num_rays].y > 0.0;
            *record = RayRecord::new(Vec3::splat(if bright { 1.0 } else { 0.0 }), 5.0);
        }
        updater
            .update(Quat::IDENTITY, &rays, &mut irradiance, &mut distance)
            .expect("update");

        let coords = UVec3::new(1, 0, 2);
        let gamma = desc.probe_irradiance_encoding_gamma;
        let sample = |dir: Vec3| {
            decode_irradiance(irradiance.sample_block(coords, octahedral_encode(dir)).truncate(), gamma)
        };
        let up = sample(Vec3::Y);
        let down = sample(Vec3::NEG_Y);
        assert!(up.x > 0.8, "up {up}");
        assert!(down.x < 0.2, "down {down}");
    }

    #[test]
    fn test_layout_mismatch_is_rejected() {
        let desc = desc(0.5);
        let other = VolumeDesc {
            probe_counts: UVec3::new(1, 1, 1),
            ..desc.clone()
        };
        let (mut irradiance, mut distance) = fields(&desc);
        let rays = RayDataBuffer::new(&other.layout());
        let result =
            ProbeFieldUpdater::new(&desc).update(Quat::IDENTITY, &rays, &mut irradiance, &mut distance);
        assert!(matches!(result, Err(GiError::LayoutMismatch { .. })));
    }
}
