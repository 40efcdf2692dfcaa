use glam::{Quat, Vec3};
use irradia_core::sampling::probe_ray_direction;
use irradia_core::{DirectionalLight, SkyModel, VolumeDesc};
use rayon::prelude::*;

use crate::error::GiError;
use crate::ray_data::{RayDataBuffer, RayRecord};
use crate::sampler::{IndirectLightSampler, ShadingPoint};
use crate::scene::{AccelerationStructure, SurfaceHit};

/// Offset along the surface normal for shadow ray origins.
pub const SHADOW_RAY_BIAS: f32 = 1e-3;

/// Casts every probe's rays into the scene and records radiance and hit
/// distance per slot.
pub struct ProbeRayTracer<'a, A: AccelerationStructure + ?Sized> {
    desc: &'a VolumeDesc,
    scene: &'a A,
    light: &'a DirectionalLight,
    sky: &'a SkyModel,
    previous: Option<IndirectLightSampler<'a>>,
}

impl<'a, A: AccelerationStructure + ?Sized> ProbeRayTracer<'a, A> {
    pub fn new(
        desc: &'a VolumeDesc,
        scene: &'a A,
        light: &'a DirectionalLight,
        sky: &'a SkyModel,
    ) -> Self {
        Self {
            desc,
            scene,
            light,
            sky,
            previous: None,
        }
    }

    /// Use last cycle's fields for one bounce of indirect light at hits.
    /// Ignored unless `probe_indirect_bounce` is set.
    pub fn with_previous_fields(mut self, previous: IndirectLightSampler<'a>) -> Self {
        self.previous = Some(previous);
        self
    }

    /// Fill `rays` for this cycle's `rotation`. Every record is overwritten.
    pub fn trace(&self, rotation: Quat, rays: &mut RayDataBuffer) -> Result<(), GiError> {
        if !self.scene.is_built() {
            return Err(GiError::AccelerationStructureStale);
        }
        let expected = self.desc.layout();
        if *rays.layout() != expected {
            return Err(GiError::LayoutMismatch {
                expected: Box::new(expected),
                actual: Box::new(*rays.layout()),
            });
        }

        let num_rays = self.desc.probe_num_rays;
        rays.records_mut()
            .par_chunks_exact_mut(num_rays as usize)
            .enumerate()
            .for_each(|(probe, records)| {
                let origin = self
                    .desc
                    .world_position_from_coords(self.desc.coords_from_index(probe as u32));
                for (slot, record) in records.iter_mut().enumerate() {
                    let direction = probe_ray_direction(slot as u32, num_rays, rotation);
                    *record = self.trace_ray(origin, direction);
                }
            });
        Ok(())
    }

    /// Radiance and distance seen along one ray.
    pub fn trace_ray(&self, origin: Vec3, direction: Vec3) -> RayRecord {
        let max_distance = self.desc.probe_max_ray_distance;
        match self.scene.intersect(origin, direction, max_distance) {
            Some(hit) if hit.front_face => RayRecord::new(self.shade(&hit, direction), hit.distance),
            // Probes inside geometry see only back faces; the short distance
            // lets the visibility test reject them.
            Some(hit) => RayRecord::new(Vec3::ZERO, hit.distance),
            None => RayRecord::new(self.sky.radiance(direction), max_distance),
        }
    }

    fn shade(&self, hit: &SurfaceHit, direction: Vec3) -> Vec3 {
        let to_light = self.light.direction.normalize_or_zero();
        let n_dot_l = hit.normal.dot(to_light).max(0.0);
        let mut radiance = hit.emission;

        if n_dot_l > 0.0 {
            let shadow_origin = hit.position + hit.normal * SHADOW_RAY_BIAS;
            if !self.scene.occluded(shadow_origin, to_light, f32::INFINITY) {
                radiance += hit.albedo * std::f32::consts::FRAC_1_PI * self.light.radiance() * n_dot_l;
            }
        }

        if self.desc.probe_indirect_bounce {
            if let Some(previous) = &self.previous {
                let point = ShadingPoint {
                    position: hit.position,
                    normal: hit.normal,
                    view_dir: direction,
                };
                radiance += hit.albedo * previous.sample(&point);
            }
        }
        radiance
    }
}
