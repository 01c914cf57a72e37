//! Placement error types.

use rcs_core::names;
use thiserror::Error;

/// Errors that fail a scheduling reconcile.
#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("RCSConfig {namespace}/{name} not found")]
    ConfigMissing { namespace: String, name: String },

    #[error("RCSConfig lists no placements and the Capp names no site")]
    NoPlacements,

    #[error("placement {namespace}/{name} not found")]
    PolicyMissing { namespace: String, name: String },

    #[error("state store error: {0}")]
    State(#[from] rcs_state::StateError),
}

impl PlacementError {
    /// Event reason for errors caused by missing scheduling inputs.
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            Self::ConfigMissing { .. } => Some(names::REASON_RCS_CONFIG_NOT_FOUND),
            Self::NoPlacements => Some(names::REASON_NO_PLACEMENTS),
            Self::PolicyMissing { .. } => Some(names::REASON_PLACEMENT_NOT_FOUND),
            Self::State(_) => None,
        }
    }
}

pub type PlacementResult<T> = Result<T, PlacementError>;
