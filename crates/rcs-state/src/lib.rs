//! rcs-state — embedded object store for the RCS control plane.
//!
//! Backed by [redb](https://docs.rs/redb), provides persistent and in-memory
//! storage for Capps, placement records, ManifestWork bundles, the config
//! and RBAC objects bundles copy, site inventory, scores, and events.
//!
//! # Architecture
//!
//! All domain types are JSON-serialized into redb's `&[u8]` value columns
//! under `{namespace}/{name}` keys, one table per [`Kind`]. Every write
//! allocates a new resource version in the same transaction, which gives
//! callers optimistic concurrency: an `update` carrying a stale version
//! fails with [`StateError::Conflict`].
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks. [`StateStore::watch`] streams
//! committed changes to informers.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::{Change, StateStore, WatchEvent, epoch_secs};
pub use types::*;
