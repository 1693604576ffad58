//! Common utilities and types for Group Orchestrator
//!
//! This crate provides shared functionality used across the orchestrator,
//! including the error taxonomy, the persisted data model, and utility functions.

pub mod constants;
pub mod error;
pub mod models;
pub mod utils;

// Re-export commonly used types
pub use error::{Error, Result};
pub use models::*;
