use glam::Quat;
use irradia_core::{DirectionalLight, SkyModel, VolumeDesc};

use crate::error::GiError;
use crate::field::ProbeField;
use crate::resources::{CpuResourcePool, CpuResources, ResourcePool};
use crate::sampler::IndirectLightSampler;
use crate::scene::AccelerationStructure;
use crate::tracer::ProbeRayTracer;
use crate::updater::ProbeFieldUpdater;

/// Immutable inputs shared by every stage of one cycle.
#[derive(Debug, Clone, Copy)]
pub struct CycleParams<'a> {
    pub desc: &'a VolumeDesc,
    /// Drawn once per cycle; tracing and update must agree on it.
    pub rotation: Quat,
    pub light: &'a DirectionalLight,
    pub sky: &'a SkyModel,
    pub cycle: u64,
}

/// Executes the probe stages on some device.
///
/// Each `dispatch_*` call only enqueues or runs its own stage; ordering is
/// the caller's job.
pub trait ProbeBackend {
    type Pool: ResourcePool;

    fn pool(&self) -> &Self::Pool;
    fn pool_mut(&mut self) -> &mut Self::Pool;

    /// Bring the scene's acceleration structure up to date.
    fn build_acceleration_structure(&mut self) -> Result<(), GiError>;

    fn dispatch_trace(&mut self, params: &CycleParams<'_>) -> Result<(), GiError>;
    fn dispatch_update(&mut self, params: &CycleParams<'_>) -> Result<(), GiError>;

    /// Make the updated fields the ones shading reads.
    fn publish_fields(&mut self, params: &CycleParams<'_>) -> Result<(), GiError>;

    /// Tear down everything the backend holds for the volume, published
    /// fields included. The next cycle starts from empty fields.
    fn release(&mut self) {
        self.pool_mut().release();
    }
}

/// Fields visible to shading, as of the last published cycle.
#[derive(Debug, Clone)]
pub struct PublishedFields {
    pub cycle: u64,
    pub irradiance: ProbeField,
    pub distance: ProbeField,
}

/// Reference backend running every stage on the host with rayon.
pub struct CpuBackend<A: AccelerationStructure> {
    scene: A,
    pool: CpuResourcePool,
    published: Option<PublishedFields>,
}

impl<A: AccelerationStructure> CpuBackend<A> {
    pub fn new(scene: A) -> Self {
        Self {
            scene,
            pool: CpuResourcePool::new(),
            published: None,
        }
    }

    pub fn scene(&self) -> &A {
        &self.scene
    }

    /// Edit the scene. Edits usually mark the structure stale.
    pub fn scene_mut(&mut self) -> &mut A {
        &mut self.scene
    }

    pub fn published(&self) -> Option<&PublishedFields> {
        self.published.as_ref()
    }

    /// Shading view over the published fields.
    pub fn sampler<'a>(&'a self, desc: &'a VolumeDesc) -> Result<IndirectLightSampler<'a>, GiError> {
        let published = self
            .published
            .as_ref()
            .ok_or(GiError::ResourceNotReady("published probe fields"))?;
        if published.irradiance.layout() != &desc.layout().irradiance {
            return Err(GiError::ResourceNotReady("published probe fields"));
        }
        Ok(IndirectLightSampler::new(
            desc,
            &published.irradiance,
            &published.distance,
        ))
    }
}

impl<A: AccelerationStructure> ProbeBackend for CpuBackend<A> {
    type Pool = CpuResourcePool;

    fn pool(&self) -> &CpuResourcePool {
        &self.pool
    }

    fn pool_mut(&mut self) -> &mut CpuResourcePool {
        &mut self.pool
    }

    fn build_acceleration_structure(&mut self) -> Result<(), GiError> {
        if !self.scene.is_built() {
            self.scene.build();
        }
        Ok(())
    }

    fn dispatch_trace(&mut self, params: &CycleParams<'_>) -> Result<(), GiError> {
        let CpuResources {
            rays,
            irradiance,
            distance,
        } = self.pool.resources_mut()?;
        let previous = IndirectLightSampler::new(params.desc, irradiance, distance);
        ProbeRayTracer::new(params.desc, &self.scene, params.light, params.sky)
            .with_previous_fields(previous)
            .trace(params.rotation, rays)
    }

    fn dispatch_update(&mut self, params: &CycleParams<'_>) -> Result<(), GiError> {
        let CpuResources {
            rays,
            irradiance,
            distance,
        } = self.pool.resources_mut()?;
        ProbeFieldUpdater::new(params.desc).update(params.rotation, rays, irradiance, distance)
    }

    fn publish_fields(&mut self, params: &CycleParams<'_>) -> Result<(), GiError> {
        let resources = self.pool.resources()?;
        self.published = Some(PublishedFields {
            cycle: params.cycle,
            irradiance: resources.irradiance.clone(),
            distance: resources.distance.clone(),
        });
        Ok(())
    }

    fn release(&mut self) {
        self.pool.release();
        self.published = None;
    }
}
