//! Cluster resource manager binding for Group Orchestrator
//!
//! This crate defines the callback contract the orchestrator implements
//! ([`Scheduler`]), the calls it can issue back ([`SchedulerDriver`]), and a
//! driver speaking the Mesos v1 scheduler HTTP API.

pub mod driver;
pub mod fmt;
pub mod http;
pub mod recordio;
pub mod scheduler;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

// Re-export commonly used types
pub use driver::SchedulerDriver;
pub use http::{DriverConfig, MesosSchedulerDriver};
pub use scheduler::Scheduler;

#[cfg(any(test, feature = "test-util"))]
pub use mock::MockSchedulerDriver;
