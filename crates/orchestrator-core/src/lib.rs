//! Core orchestration logic for Group Orchestrator
//!
//! This crate holds the cluster state store, the task reconciler and the
//! coordinator that reacts to resource-manager events and administrative
//! requests.

pub mod coordinator;
pub mod reconciler;
pub mod state;

// Re-export commonly used types
pub use coordinator::Coordinator;
pub use reconciler::{Reconciler, ReconcilerConfig};
pub use state::ClusterState;
