//! Administrative HTTP API for Group Orchestrator
//!
//! This crate exposes the group management endpoints over HTTP and provides
//! the typed client the command line uses to call them.

pub mod client;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;

// Re-export commonly used types
pub use client::ApiClient;
pub use error::{ApiError, ErrorResponse};
pub use routes::router;
pub use server::{listen_addr, ApiServer};
