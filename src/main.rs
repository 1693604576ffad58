use anyhow::Result;
use clap::Parser;

use cli_interface::{run_group, Cli, Command};
use config::ConfigManager;
use group_orchestrator::{Framework, FrameworkConfig};
use logging::LogConfig;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_manager = match &cli.config {
        Some(path) => ConfigManager::with_file(path)?,
        None => ConfigManager::new()?,
    };

    match cli.command {
        Command::Framework(args) => {
            args.apply(&config_manager)?;
            logging::init(&LogConfig::from_config(&config_manager))?;

            let config = FrameworkConfig::from_config(&config_manager)?;
            Framework::new(config).await?.run().await?;
        }
        Command::Group(command) => {
            logging::init(&LogConfig::from_config(&config_manager))?;

            let output = run_group(&command, &config_manager).await?;
            if !output.is_empty() {
                println!("{}", output);
            }
        }
    }

    Ok(())
}
