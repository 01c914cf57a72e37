//! rcs-core — shared vocabulary for the RCS control plane.
//!
//! Holds the well-known names every controller agrees on (API group,
//! annotation keys, the cleanup finalizer, event reasons), Kubernetes-style
//! resource quantity parsing, and the `rcsd.toml` daemon configuration.

pub mod config;
pub mod names;
pub mod quantity;

pub use config::DaemonConfig;
pub use quantity::{Quantity, QuantityError};
