//! rcs-status — projects site-reported feedback back onto Capps.
//!
//! Bundles carry JSON-path feedback rules. The site's work agent evaluates
//! them against the live Capp and reports typed values on the bundle
//! status; the `StatusReconciler` maps those values onto the hub Capp's
//! status and writes only when something changed.
//!
//! # Components
//!
//! - **`feedback`** — JSON-path evaluation and reading reported values
//! - **`projector`** — pure mapping from values to `CappStatus`
//! - **`reconciler`** — `StatusReconciler` and its Capp predicate
//! - **`agent`** — in-process work agent for standalone mode

pub mod agent;
pub mod error;
pub mod feedback;
pub mod projector;
pub mod reconciler;

pub use agent::WorkAgent;
pub use error::{StatusError, StatusResult};
pub use feedback::{evaluate, record_feedback, values_for};
pub use projector::project;
pub use reconciler::{StatusReconciler, should_project};
