//! Configuration management for Group Orchestrator
//!
//! This crate layers built-in defaults, an optional configuration file,
//! `GM_*` environment variables and command-line overrides into a single
//! lookup surface.

pub mod defaults;
pub mod manager;

// Re-export commonly used types
pub use defaults::{DEFAULTS, ENV_PREFIX};
pub use manager::ConfigManager;
