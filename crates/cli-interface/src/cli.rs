//! Command definitions

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use common::error::Result;
use config::ConfigManager;

/// Consumer group orchestrator
#[derive(Debug, Parser)]
#[command(name = "group-orchestrator", version, about = "Consumer group orchestrator")]
pub struct Cli {
    /// Configuration file
    #[arg(long, global = true, env = "GM_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Launch the framework
    Framework(FrameworkArgs),

    /// Manage consumer groups
    #[command(subcommand)]
    Group(GroupCommand),
}

/// Address of the administrative API
#[derive(Debug, Clone, Default, Args)]
pub struct ApiArgs {
    /// API server address. Falls back to the GM_API environment variable.
    #[arg(long)]
    pub api: Option<String>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct FrameworkArgs {
    #[command(flatten)]
    pub api: ApiArgs,

    /// Resource manager master address in form <ip>:<port>
    #[arg(long)]
    pub master: Option<String>,

    /// Framework name
    #[arg(long)]
    pub framework_name: Option<String>,

    /// Framework role
    #[arg(long)]
    pub framework_role: Option<String>,

    /// Framework failover timeout, e.g. `30s` or `365days`
    #[arg(long)]
    pub framework_timeout: Option<String>,

    /// Storage for cluster state, `file:<path>` or `zk:<host:port>[/chroot]`
    #[arg(long)]
    pub storage: Option<String>,

    /// User tasks run as. Defaults to the current system user.
    #[arg(long)]
    pub user: Option<String>,

    /// Local address the driver binds to
    #[arg(long)]
    pub bind_ip: Option<String>,
}

impl FrameworkArgs {
    /// Writes every flag that was given into the configuration as an override
    pub fn apply(&self, config_manager: &ConfigManager) -> Result<()> {
        let flags = [
            ("api", &self.api.api),
            ("master", &self.master),
            ("framework_name", &self.framework_name),
            ("framework_role", &self.framework_role),
            ("framework_timeout", &self.framework_timeout),
            ("storage", &self.storage),
            ("user", &self.user),
            ("bind_ip", &self.bind_ip),
        ];

        for (key, value) in flags {
            if let Some(value) = value {
                config_manager.set_override(key, value.clone())?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum GroupCommand {
    /// Add consumer group
    Add(GroupAddArgs),

    /// Update consumer group configuration
    Update,

    /// Start consumer group
    Start,

    /// Stop consumer group
    Stop,

    /// Remove consumer group
    Remove,

    /// List consumer groups
    List(ApiArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct GroupAddArgs {
    #[command(flatten)]
    pub api: ApiArgs,

    /// Group ID to identify a set of consumers. Required.
    #[arg(long)]
    pub id: Option<String>,

    /// Group subscription expression
    #[arg(long)]
    pub subscription: Option<String>,

    /// Group bootstrap brokers used to discover the cluster
    #[arg(long)]
    pub bootstrap_brokers: Option<String>,
}
