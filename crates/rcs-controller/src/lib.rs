//! rcs-controller — the reconcile runtime shared by every RCS controller.
//!
//! # Architecture
//!
//! ```text
//! StateStore ──watch()──▶ dispatcher ──▶ Informer<T> (cache + predicate + mapper)
//!                                              │
//!                                              ▼
//!                                          WorkQueue (dedupe, per-key serial,
//!                                              │        requeue-after, backoff)
//!                                              ▼
//!                                     workers ──▶ Reconciler::reconcile(key)
//! ```
//!
//! Reconcilers are level-triggered: each call re-reads everything it needs
//! and returns an [`Action`]. Errors are retried with per-key exponential
//! backoff. [`EventRecorder`] is the write-only observability channel.

pub mod controller;
pub mod events;
pub mod informer;
pub mod queue;

pub use controller::{Action, Controller, Reconciler};
pub use events::{DEFAULT_EVENT_TTL, EventRecorder, expire_events, run_expiry};
pub use informer::{Informer, Source};
pub use queue::WorkQueue;
