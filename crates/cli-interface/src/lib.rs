//! Command-line interface for Group Orchestrator
//!
//! This crate defines the command surface (`framework`, `group ...`) and runs
//! the group administration commands against a running orchestrator.

pub mod cli;
pub mod commands;
pub mod formatters;

// Re-export commonly used types
pub use cli::{ApiArgs, Cli, Command, FrameworkArgs, GroupAddArgs, GroupCommand};
pub use commands::{resolve_api, run_group, CliError};
