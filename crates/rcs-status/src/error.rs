//! Status feedback error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("invalid feedback path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("state store error: {0}")]
    State(#[from] rcs_state::StateError),
}

pub type StatusResult<T> = Result<T, StatusError>;
