pub mod config;
pub mod constants;
pub mod error;
pub mod lighting;
pub mod math;
pub mod octahedral;
pub mod rotation;
pub mod sampling;
pub mod sky;
pub mod types;
pub mod volume;

pub use config::{load_volume_config, load_volume_desc, VolumeConfig};
pub use error::ConfigError;
pub use lighting::DirectionalLight;
pub use rotation::RandomRotationGenerator;
pub use sky::SkyModel;
pub use types::{FieldKind, FieldLayout, GridLayout, ProbeCoord, TextureExtent};
pub use volume::VolumeDesc;
