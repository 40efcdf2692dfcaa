use glam::{UVec3, Vec3};
use thiserror::Error;

/// Errors raised while loading or validating a probe volume descriptor.
///
/// All of these are caught before any dispatch is recorded.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("probe counts must be at least 1 on every axis, got {0}")]
    InvalidProbeCounts(UVec3),

    #[error("probe spacing must be positive on every axis, got {0}")]
    NonPositiveSpacing(Vec3),

    #[error("probe_num_rays must be at least 1")]
    ZeroRayCount,

    #[error("{field} must be at least 1")]
    ZeroInteriorTexels { field: &'static str },

    #[error("probe_hysteresis must be in [0, 1], got {0}")]
    HysteresisOutOfRange(f32),

    #[error("{field} must be positive and finite, got {value}")]
    NonPositive { field: &'static str, value: f32 },

    #[error("{field} must be non-negative and finite, got {value}")]
    NegativeBias { field: &'static str, value: f32 },

    #[error("{what} does not fit in 32 bits")]
    GridTooLarge { what: &'static str },

    #[error("origin must be finite, got {0}")]
    NonFiniteOrigin(Vec3),

    #[error("Failed to parse volume RON: {0}")]
    ParseError(String),
}
