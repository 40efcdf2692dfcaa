use irradia_core::{ConfigError, GridLayout};
use thiserror::Error;

use crate::stages::Stage;

/// Errors that stop a probe update cycle before anything is committed.
#[derive(Debug, Error, PartialEq)]
pub enum GiError {
    #[error("invalid probe volume: {0}")]
    Config(#[from] ConfigError),

    #[error("{0} requested before it was created")]
    ResourceNotReady(&'static str),

    #[error("resources were created for a different grid layout")]
    LayoutMismatch {
        expected: Box<GridLayout>,
        actual: Box<GridLayout>,
    },

    #[error("acceleration structure is stale; rebuild it before tracing")]
    AccelerationStructureStale,

    #[error("stage {found:?} started out of order (expected {expected:?})")]
    StageOutOfOrder { expected: Stage, found: Stage },

    #[error("backend failure: {0}")]
    Backend(String),
}
