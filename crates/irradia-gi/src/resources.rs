use irradia_core::GridLayout;

use crate::error::GiError;
use crate::field::ProbeField;
use crate::ray_data::RayDataBuffer;

/// What `resize_if_needed` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeOutcome {
    /// Existing resources already match the layout.
    Unchanged,
    /// First allocation.
    Created,
    /// Layout changed; old resources were dropped and new ones allocated.
    Recreated,
}

/// Owns the ray data and both probe fields for one volume.
///
/// Allocation is separate from dispatch: the orchestrator calls
/// `resize_if_needed` once per cycle before any stage runs.
pub trait ResourcePool {
    /// Make sure resources exist and match `layout`. Idempotent.
    fn resize_if_needed(&mut self, layout: &GridLayout) -> ResizeOutcome;

    /// Drop all resources. The next `resize_if_needed` recreates them.
    fn release(&mut self);

    fn is_ready(&self) -> bool;

    /// Layout of the current resources, if any.
    fn layout(&self) -> Option<&GridLayout>;
}

/// Host-side probe resources.
#[derive(Debug, Clone)]
pub struct CpuResources {
    pub rays: RayDataBuffer,
    pub irradiance: ProbeField,
    pub distance: ProbeField,
}

impl CpuResources {
    pub fn new(layout: &GridLayout) -> Self {
        Self {
            rays: RayDataBuffer::new(layout),
            irradiance: ProbeField::new(layout.irradiance),
            distance: ProbeField::new(layout.distance),
        }
    }
}

#[derive(Debug, Default)]
pub struct CpuResourcePool {
    layout: Option<GridLayout>,
    resources: Option<CpuResources>,
    /// Number of allocations since creation.
    allocations: u32,
}

impl CpuResourcePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocations(&self) -> u32 {
        self.allocations
    }

    pub fn resources(&self) -> Result<&CpuResources, GiError> {
        self.resources
            .as_ref()
            .ok_or(GiError::ResourceNotReady("probe resources"))
    }

    pub fn resources_mut(&mut self) -> Result<&mut CpuResources, GiError> {
        self.resources
            .as_mut()
            .ok_or(GiError::ResourceNotReady("probe resources"))
    }
}

impl ResourcePool for CpuResourcePool {
    fn resize_if_needed(&mut self, layout: &GridLayout) -> ResizeOutcome {
        let outcome = match &self.layout {
            Some(current) if current == layout && self.resources.is_some() => {
                return ResizeOutcome::Unchanged
            }
            Some(_) => ResizeOutcome::Recreated,
            None => ResizeOutcome::Created,
        };
        self.resources = Some(CpuResources::new(layout));
        self.layout = Some(*layout);
        self.allocations += 1;
        log::info!(
            "Allocated probe resources: {}x{}x{} probes, {} rays, {:?}",
            layout.probe_counts.x,
            layout.probe_counts.y,
            layout.probe_counts.z,
            layout.num_rays,
            outcome
        );
        outcome
    }

    fn release(&mut self) {
        if self.resources.take().is_some() {
            log::info!("Released probe resources");
        }
        self.layout = None;
    }

    fn is_ready(&self) -> bool {
        self.resources.is_some()
    }

    fn layout(&self) -> Option<&GridLayout> {
        self.layout.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::UVec3;
    use irradia_core::VolumeDesc;

    fn layout(counts: UVec3) -> GridLayout {
        VolumeDesc {
            probe_counts: counts,
            probe_num_rays: 8,
            ..VolumeDesc::default()
        }
        .layout()
    }

    #[test]
    fn test_pool_starts_empty() {
        let pool = CpuResourcePool::new();
        assert!(!pool.is_ready());
        assert_eq!(
            pool.resources().map(|_| ()),
            Err(GiError::ResourceNotReady("probe resources"))
        );
    }

    #[test]
    fn test_resize_is_lazy_and_idempotent() {
        let mut pool = CpuResourcePool::new();
        let a = layout(UVec3::new(2, 2, 2));
        assert_eq!(pool.resize_if_needed(&a), ResizeOutcome::Created);
        assert_eq!(pool.resize_if_needed(&a), ResizeOutcome::Unchanged);
        assert_eq!(pool.resize_if_needed(&a), ResizeOutcome::Unchanged);
        assert_eq!(pool.allocations(), 1);
        assert!(pool.is_ready());
    }

    #[test]
    fn test_layout_change_recreates() {
        let mut pool = CpuResourcePool::new();
        pool.resize_if_needed(&layout(UVec3::new(2, 2, 2)));
        let b = layout(UVec3::new(3, 1, 2));
        assert_eq!(pool.resize_if_needed(&b), ResizeOutcome::Recreated);
        assert_eq!(pool.layout(), Some(&b));
        let resources = pool.resources().expect("ready");
        assert_eq!(*resources.rays.layout(), b);
        assert_eq!(*resources.irradiance.layout(), b.irradiance);
        assert_eq!(pool.allocations(), 2);
    }

    #[test]
    fn test_release_then_resize_creates_again() {
        let mut pool = CpuResourcePool::new();
        let a = layout(UVec3::new(2, 2, 2));
        pool.resize_if_needed(&a);
        pool.release();
        assert!(!pool.is_ready());
        assert_eq!(pool.layout(), None);
        assert_eq!(pool.resize_if_needed(&a), ResizeOutcome::Created);
    }
}
