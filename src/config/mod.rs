//! Monitor Configuration Module
//!
//! Per-deployment configuration loaded from TOML files. Every field has a
//! built-in default, so an absent file changes nothing.
//!
//! ## Loading Order
//!
//! 1. `MACHINE_GUARD_CONFIG` environment variable (path to TOML file)
//! 2. `machine_guard.toml` in the current working directory
//! 3. Built-in defaults
//!
//! The loaded config is passed explicitly to [`Monitor`](crate::pipeline::Monitor);
//! there is no process-global copy.

mod monitor_config;
pub mod defaults;
pub mod validation;

pub use monitor_config::*;
