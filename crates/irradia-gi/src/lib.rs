pub mod backend;
pub mod error;
pub mod field;
pub mod ray_data;
pub mod resources;
pub mod sampler;
pub mod scene;
pub mod stages;
pub mod tracer;
pub mod updater;
pub mod visualization;
pub mod volume;

pub use backend::{CpuBackend, CycleParams, ProbeBackend, PublishedFields};
pub use error::GiError;
pub use field::ProbeField;
pub use ray_data::{RayDataBuffer, RayRecord};
pub use resources::{CpuResourcePool, CpuResources, ResizeOutcome, ResourcePool};
pub use sampler::{IndirectLightSampler, IndirectSample, ProbeContribution, ShadingPoint};
pub use scene::{AccelerationStructure, BoxScene, BvhNode, SceneBox, SurfaceHit};
pub use stages::{ResourceId, Stage, StageSchedule};
pub use tracer::ProbeRayTracer;
pub use updater::ProbeFieldUpdater;
pub use visualization::{probe_debug_lines, probe_instance_matrices, DebugVertex, ViewKind};
pub use volume::{CycleReport, ProbeVolume};
