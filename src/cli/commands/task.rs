//! Implementation of the `task` inspection subcommands: `list`, `show`,
//! `tree`.

use std::path::Path;

use anyhow::{bail, Result};
use uuid::Uuid;

use crate::cli::display::{render_task_detail, render_task_table, render_tree};
use crate::domain::models::config::Config;
use crate::domain::models::TaskTree;
use crate::domain::ports::{BlueprintRepository, TaskRepository};
use crate::infrastructure::database::{connect, SqliteTaskRepository};

async fn load_repo(config: &Config) -> Result<SqliteTaskRepository> {
    let pool = connect(Path::new(&config.database.path), config.database.max_connections).await?;
    Ok(SqliteTaskRepository::new(pool))
}

async fn load_all_tasks(config: &Config, repo: &SqliteTaskRepository) -> Result<Vec<crate::domain::models::Task>> {
    // Every task belongs to exactly one blueprint per run; the CLI's
    // `task` view operates on the most recently created blueprint.
    let pool = connect(Path::new(&config.database.path), config.database.max_connections).await?;
    let blueprints = crate::infrastructure::database::SqliteBlueprintRepository::new(pool)
        .list()
        .await?;
    let Some(latest) = blueprints.into_iter().max_by_key(|b| b.created_at) else {
        return Ok(Vec::new());
    };
    Ok(repo.list_by_blueprint(latest.id).await?)
}

/// List all tasks in the current run as a table.
///
/// # Errors
/// Propagates database errors.
pub async fn list(config: &Config) -> Result<()> {
    let repo = load_repo(config).await?;
    let tasks = load_all_tasks(config, &repo).await?;
    println!("{}", render_task_table(&tasks));
    Ok(())
}

/// Show one task's full detail, including checkpoint history.
///
/// # Errors
/// Fails if the task does not exist, or propagates database errors.
pub async fn show(config: &Config, task_id: Uuid) -> Result<()> {
    let repo = load_repo(config).await?;
    let Some(task) = repo.get(task_id).await? else {
        bail!("task not found: {task_id}");
    };
    println!("{}", render_task_detail(&task));
    Ok(())
}

/// Show the task tree for the current run.
///
/// # Errors
/// Propagates database errors, or a `DomainError` if the persisted
/// tasks no longer form a valid tree.
pub async fn tree(config: &Config) -> Result<()> {
    let repo = load_repo(config).await?;
    let tasks = load_all_tasks(config, &repo).await?;
    let tree = TaskTree::from_nodes(tasks)?;
    println!("{}", render_tree(&tree));
    Ok(())
}
