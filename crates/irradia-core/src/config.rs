use serde::Deserialize;

use crate::error::ConfigError;
use crate::lighting::DirectionalLight;
use crate::sky::SkyModel;
use crate::volume::VolumeDesc;

/// Everything a probe volume needs from the outside world, as authored in
/// a RON file. Missing fields fall back to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    pub volume: VolumeDesc,
    pub light: DirectionalLight,
    pub sky: SkyModel,
    /// Seed for the per-cycle rotation; `None` seeds from OS entropy.
    pub rotation_seed: Option<u64>,
}

/// Parse a bare `VolumeDesc` from RON and validate it.
pub fn load_volume_desc(ron_str: &str) -> Result<VolumeDesc, ConfigError> {
    let options = ron::Options::default();
    let desc: VolumeDesc = options
        .from_str(ron_str)
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;
    desc.validate()?;
    log::debug!(
        "Loaded probe volume: {} probes, {} rays each",
        desc.probe_count(),
        desc.probe_num_rays
    );
    Ok(desc)
}

/// Parse a full `VolumeConfig` from RON and validate its volume.
pub fn load_volume_config(ron_str: &str) -> Result<VolumeConfig, ConfigError> {
    let options = ron::Options::default();
    let config: VolumeConfig = options
        .from_str(ron_str)
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;
    config.volume.validate()?;
    Ok(config)
}
