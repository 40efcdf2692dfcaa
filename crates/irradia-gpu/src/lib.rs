//! wgpu compute backend for the probe volume.
//!
//! Kernels live in `shaders/probes/`; constants they share with the host are
//! injected through a generated preamble (see [`passes::constants_preamble`]).

pub mod backend;
pub mod device;
pub mod error;
pub mod passes;
pub mod readback;
pub mod scene;
pub mod textures;
pub mod uniforms;

pub use backend::WgpuBackend;
pub use device::request_device;
pub use error::GpuError;
pub use passes::ProbeKernels;
pub use readback::read_back_field;
pub use scene::GpuBoxScene;
pub use textures::{GpuProbeTextures, GpuResourcePool, ProbeTexture};
pub use uniforms::GpuVolumeUniforms;
