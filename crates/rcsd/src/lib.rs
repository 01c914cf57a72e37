//! rcsd — wiring shared by the `rcsd` binary and its integration tests.
//!
//! - **`controllers`** — hub controllers and RCSConfig seeding
//! - **`sites`** — per-site score and work agents

pub mod controllers;
pub mod sites;

pub use controllers::{seed_rcs_config, spawn_controllers};
pub use sites::{merge_sites, spawn_site_agents};
