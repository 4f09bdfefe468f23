//! Implementation of the `init` command.

use anyhow::Result;

use crate::infrastructure::setup::{create_config_dir, create_config_file, run_migrations, SetupPaths};

/// Initialize `.abathur/` for the current project: config directory,
/// default config file, and database migrations.
///
/// # Errors
/// Propagates filesystem and database errors from the setup helpers.
pub async fn execute(force: bool) -> Result<()> {
    let paths = SetupPaths::new()?;

    if paths.is_initialized() && !force {
        println!(
            "already initialized at {} (use --force to reinitialize)",
            paths.config_dir.display()
        );
        return Ok(());
    }

    create_config_dir(&paths, force)?;
    create_config_file(&paths, force)?;
    run_migrations(&paths, force).await?;

    println!("initialized {}", paths.config_dir.display());
    Ok(())
}
