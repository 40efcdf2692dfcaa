use irradia_gi::GiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("no suitable GPU adapter found")]
    NoAdapter,

    #[error("failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("texture readback failed: {0}")]
    Readback(String),

    #[error("{0} requested before it was created")]
    ResourceNotReady(&'static str),
}

impl From<GpuError> for GiError {
    fn from(e: GpuError) -> Self {
        match e {
            GpuError::ResourceNotReady(what) => GiError::ResourceNotReady(what),
            other => GiError::Backend(other.to_string()),
        }
    }
}
