//! rcs-placement — binds each Capp to exactly one managed cluster.
//!
//! This crate resolves a Capp's target site and commits the binding. It
//! does not compute decisions itself: policy-driven placement reads the
//! PlacementDecision records an external decision engine publishes.
//!
//! # Components
//!
//! - **`decision`** — Target resolution and candidate selection (pure)
//! - **`predicate`** — Which Capp changes need scheduling (pure)
//! - **`reconciler`** — `PlacementReconciler`, the store-facing loop body

pub mod decision;
pub mod error;
pub mod predicate;
pub mod reconciler;

pub use decision::{Target, pick_site, resolve_target};
pub use error::{PlacementError, PlacementResult};
pub use predicate::should_schedule;
pub use reconciler::PlacementReconciler;
