//! Project initialization: config directory, default config file, and
//! database migrations for the `init` CLI command.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Orchestrator configuration.
# Override settings by editing this file or setting environment variables
# with an ABATHUR_ prefix and double-underscore nesting, e.g.:
#   export ABATHUR_SCHEDULER__CONCURRENCY_LIMIT=8
#   export ABATHUR_DATABASE__PATH=.abathur/orchestrator.db
#   export ABATHUR_LOGGING__LEVEL=debug

database:
  path: ".abathur/orchestrator.db"
  max_connections: 10

logging:
  level: "info"
  format: "json"
  retention_days: 7

granularity:
  min_task_complexity: 15.0
  max_task_complexity: 75.0
  ideal_task_duration: 30.0
  max_depth: 5

reviewer:
  enabled: true
  strictness: "normal"
  max_retries: 3

scheduler:
  concurrency_limit: 4

sandbox:
  base_dir: ".abathur/sandboxes"
  lock_dir: ".abathur/locks"
"#;

/// Filesystem locations this engine manages for a project.
pub struct SetupPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub database_file: PathBuf,
}

impl SetupPaths {
    /// Resolve paths relative to the current directory.
    ///
    /// # Errors
    /// Fails if the current directory cannot be determined.
    pub fn new() -> Result<Self> {
        let current_dir = std::env::current_dir().context("failed to get current directory")?;
        let config_dir = current_dir.join(".abathur");
        Ok(Self {
            config_file: config_dir.join("config.yaml"),
            database_file: config_dir.join("orchestrator.db"),
            config_dir,
        })
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.config_file.exists() && self.database_file.exists()
    }
}

/// Create `.abathur/` if it doesn't already exist (or `force` is set).
///
/// # Errors
/// Propagates filesystem errors creating the directory.
pub fn create_config_dir(paths: &SetupPaths, force: bool) -> Result<()> {
    if paths.config_dir.exists() && !force {
        return Ok(());
    }
    fs::create_dir_all(&paths.config_dir).context("failed to create config directory")?;
    Ok(())
}

/// Write the default `config.yaml` if it doesn't already exist (or
/// `force` is set).
///
/// # Errors
/// Propagates filesystem errors writing the file.
pub fn create_config_file(paths: &SetupPaths, force: bool) -> Result<()> {
    if paths.config_file.exists() && !force {
        return Ok(());
    }
    fs::write(&paths.config_file, DEFAULT_CONFIG_TEMPLATE)
        .context("failed to write config file")?;
    Ok(())
}

/// Create the `SQLite` database and run pending migrations.
///
/// # Errors
/// Propagates filesystem and database errors.
pub async fn run_migrations(paths: &SetupPaths, force: bool) -> Result<()> {
    if let Some(parent) = paths.database_file.parent() {
        fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db_exists = paths.database_file.exists();
    if db_exists && !force {
        return Ok(());
    }

    let db_url = format!("sqlite:{}?mode=rwc", paths.database_file.display());
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&db_url)
        .await
        .context("failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    pool.close().await;
    Ok(())
}
