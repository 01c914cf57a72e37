//! rcs-sync — synthesizes and ships a placed Capp's ManifestWork bundle.
//!
//! # Components
//!
//! - **`builders`** — JSON manifests for the objects a bundle carries
//! - **`director`** — `Assembler` trait and the ordered `CappDirector`
//! - **`base`**, **`volumes`**, **`auth`** — the three assemblers
//! - **`bundle`** — create-or-replace of the ManifestWork and its feedback rules
//! - **`finalizer`** — cleanup finalizer and deletion handling
//! - **`predicate`** — which Capp changes reach the sync controller
//! - **`reconciler`** — `SyncReconciler`

pub mod auth;
pub mod base;
pub mod builders;
pub mod bundle;
pub mod director;
pub mod error;
pub mod finalizer;
pub mod predicate;
pub mod reconciler;
pub mod volumes;

pub use bundle::{BundleOutcome, feedback_configs, sync_bundle};
pub use director::{Assembler, CappDirector, DirectorContext};
pub use error::{SyncError, SyncResult};
pub use finalizer::{ensure_finalizer, handle_deletion};
pub use predicate::should_sync;
pub use reconciler::SyncReconciler;
