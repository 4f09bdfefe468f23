//! `abathur-orch` CLI entry point.

use abathur_orch::cli::commands::{adjust, control, init, run, task};
use abathur_orch::cli::{Cli, Commands, TaskAction};
use abathur_orch::infrastructure::config::ConfigLoader;
use abathur_orch::infrastructure::logging::{LogConfig, LoggerImpl};
use anyhow::{Context, Result};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init { force } = cli.command {
        init::execute(force).await?;
        return Ok(());
    }

    let config = ConfigLoader::load().context("failed to load configuration")?;
    let _logger = LoggerImpl::init(&LogConfig::from(&config.logging))
        .context("failed to initialize logging")?;

    match cli.command {
        Commands::Init { .. } => unreachable!("handled above"),
        Commands::Run { blueprint, source_root } => {
            run::execute(&config, blueprint, source_root).await?;
        }
        Commands::Adjust => adjust::execute(&config).await?,
        Commands::Pause => control::pause(&config)?,
        Commands::Resume => control::resume(&config)?,
        Commands::Cancel { task_id } => control::cancel(&config, task_id).await?,
        Commands::Task { action } => match action {
            TaskAction::List => task::list(&config).await?,
            TaskAction::Show { task_id } => task::show(&config, task_id).await?,
            TaskAction::Tree => task::tree(&config).await?,
        },
    }

    Ok(())
}
