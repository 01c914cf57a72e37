//! Scorer error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("{name}={value:?} is not a number")]
    InvalidBound { name: &'static str, value: String },

    #[error("{max_name} must be greater than {min_name}")]
    EmptyRange {
        max_name: &'static str,
        min_name: &'static str,
    },

    #[error("state store error: {0}")]
    State(#[from] rcs_state::StateError),
}

pub type ScoreResult<T> = Result<T, ScoreError>;
