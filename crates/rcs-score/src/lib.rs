//! rcs-score — per-site resource fitness for placement.
//!
//! Each site runs a [`ScoreAgent`] that sums schedulable node capacity,
//! subtracts pod requests, and publishes the normalized cpu and memory
//! headroom as an `AddOnPlacementScore` named `resource-usage-score` in the
//! site namespace. The scheduler does not read it; external decision
//! engines do.

pub mod agent;
pub mod calculate;
pub mod error;

pub use agent::ScoreAgent;
pub use calculate::{ResourceScores, ScoreBounds, normalize, score};
pub use error::{ScoreError, ScoreResult};
