//! Implementation of the `adjust` command: a granularity dry-run over
//! the current run's task tree (spec §6 `adjustGranularity(tree,
//! modules, config) -> AdjustmentResult`). Never mutates persisted
//! state; splitting/merging remains the `run` command's job.

use std::path::Path;

use anyhow::Result;

use crate::cli::display::render_adjustment_result;
use crate::domain::models::config::Config;
use crate::domain::models::TaskTree;
use crate::domain::ports::{BlueprintRepository, TaskRepository};
use crate::infrastructure::database::{connect, SqliteBlueprintRepository, SqliteTaskRepository};
use crate::services::GranularityController;

/// Run the granularity controller over the current run's task tree
/// without applying any split or merge, and print the resulting
/// scores, split suggestions, merge suggestions, and structural
/// diagnostics.
///
/// # Errors
/// Propagates database errors, or a `DomainError` if the persisted
/// tasks no longer form a valid tree.
pub async fn execute(config: &Config) -> Result<()> {
    let pool = connect(Path::new(&config.database.path), config.database.max_connections).await?;
    let blueprint_repo = SqliteBlueprintRepository::new(pool.clone());
    let task_repo = SqliteTaskRepository::new(pool);

    let blueprints = blueprint_repo.list().await?;
    let Some(blueprint) = blueprints.into_iter().max_by_key(|b| b.created_at) else {
        println!("no blueprint found; run `init` and `run` first");
        return Ok(());
    };

    let tasks = task_repo.list_by_blueprint(blueprint.id).await?;
    let tree = TaskTree::from_nodes(tasks)?;

    let modules = blueprint.module_ids();
    let controller = GranularityController::new(config.granularity.clone());
    let result = controller.adjust_granularity(&tree, &modules);

    println!("{}", render_adjustment_result(&result));
    Ok(())
}
