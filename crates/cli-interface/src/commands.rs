//! Group administration commands

use thiserror::Error;
use tracing::debug;

use api_gateway::ApiClient;
use common::error::Error;
use config::ConfigManager;

use crate::cli::{ApiArgs, GroupAddArgs, GroupCommand};
use crate::formatters::fmt_groups;

/// Command failures reported to the user
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Unspecified API server address. Use --api flag or GM_API env to set.")]
    ApiRequired,

    #[error("Group --id flag is required.")]
    GroupIdRequired,

    #[error(transparent)]
    Orchestrator(#[from] Error),
}

/// API address from the `--api` flag, else from the configuration (`GM_API`)
pub fn resolve_api(args: &ApiArgs, config_manager: &ConfigManager) -> Result<String, CliError> {
    args.api
        .clone()
        .filter(|api| !api.is_empty())
        .or_else(|| config_manager.get_optional_string("api"))
        .ok_or(CliError::ApiRequired)
}

/// Runs a group command and returns what should be printed
pub async fn run_group(
    command: &GroupCommand,
    config_manager: &ConfigManager,
) -> Result<String, CliError> {
    match command {
        GroupCommand::Add(args) => group_add(args, config_manager).await.map(|_| String::new()),
        GroupCommand::List(args) => group_list(args, config_manager).await,
        GroupCommand::Update => Err(Error::NotImplemented("group update".to_string()).into()),
        GroupCommand::Start => Err(Error::NotImplemented("group start".to_string()).into()),
        GroupCommand::Stop => Err(Error::NotImplemented("group stop".to_string()).into()),
        GroupCommand::Remove => Err(Error::NotImplemented("group remove".to_string()).into()),
    }
}

async fn group_add(args: &GroupAddArgs, config_manager: &ConfigManager) -> Result<(), CliError> {
    let api = resolve_api(&args.api, config_manager)?;
    let id = args.id.as_deref().ok_or(CliError::GroupIdRequired)?;

    debug!("Adding group {} via {}", id, api);
    ApiClient::new(&api)
        .add_group(
            id,
            args.subscription.as_deref().unwrap_or_default(),
            args.bootstrap_brokers.as_deref().unwrap_or_default(),
        )
        .await?;
    Ok(())
}

async fn group_list(args: &ApiArgs, config_manager: &ConfigManager) -> Result<String, CliError> {
    let api = resolve_api(args, config_manager)?;
    let groups = ApiClient::new(&api).list_groups().await?;
    Ok(fmt_groups(&groups, 0))
}
