//! Implementation of the `run` command: load a blueprint, seed and
//! granularity-adjust its task tree, then drive the scheduler.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{watch, Mutex};

use crate::cli::commands::control::{control_file_path, read_control_signal};
use crate::domain::models::config::Config;
use crate::domain::models::Blueprint;
use crate::domain::ports::{BlueprintRepository, TaskRepository};
use crate::infrastructure::database::{SqliteBlueprintRepository, SqliteTaskRepository};
use crate::infrastructure::substrates::{self, registry::SubstrateKind};
use crate::services::{
    seed_from_blueprint, ContextCollector, ControlSignal, GranularityController, Reviewer,
    SandboxManager, Scheduler, SchedulerOptions, Worker,
};

fn load_blueprint(path: &Path) -> Result<Blueprint> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read blueprint file {}", path.display()))?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&raw).context("failed to parse blueprint json"),
        _ => serde_yaml::from_str(&raw).context("failed to parse blueprint yaml"),
    }
}

/// Run (or resume) orchestration for a blueprint.
///
/// # Errors
/// Propagates blueprint-loading, database, and orchestration errors.
pub async fn execute(config: &Config, blueprint_path: PathBuf, source_root: PathBuf) -> Result<()> {
    let blueprint = load_blueprint(&blueprint_path)?;

    let pool = crate::infrastructure::database::connect(
        Path::new(&config.database.path),
        config.database.max_connections,
    )
    .await?;

    let blueprint_repo: Arc<dyn BlueprintRepository> =
        Arc::new(SqliteBlueprintRepository::new(pool.clone()));
    let task_repo: Arc<dyn TaskRepository> = Arc::new(SqliteTaskRepository::new(pool.clone()));

    blueprint_repo.create(&blueprint).await?;

    let mut tree = seed_from_blueprint(&blueprint)?;

    let modules = blueprint.module_ids();
    let granularity = GranularityController::new(config.granularity.clone());
    loop {
        let splits = granularity.apply_one_pass(&mut tree, &modules)?;
        if splits == 0 {
            break;
        }
    }

    for task in tree.all() {
        task_repo.create(task).await?;
    }

    let agent_runner = substrates::build(&SubstrateKind::default());
    let sandbox_base = PathBuf::from(&config.sandbox.base_dir);
    let sandboxes = Arc::new(SandboxManager::new(sandbox_base.clone()));
    let context_collector = Arc::new(ContextCollector::new(config.context.clone()));
    let worker = Arc::new(Worker::new(Arc::clone(&agent_runner), sandbox_base.join("output")));
    let reviewer = Arc::new(Reviewer::new(
        Arc::clone(&agent_runner),
        config.reviewer.strictness,
        config.reviewer.max_turns,
    ));

    let (control_tx, control_rx) = watch::channel(ControlSignal::Run);
    let control_path = control_file_path(config);
    let poller_tx = control_tx.clone();
    tokio::spawn(async move {
        loop {
            if let Ok(signal) = read_control_signal(&control_path) {
                if poller_tx.send(signal).is_err() {
                    break;
                }
                if signal == ControlSignal::Cancelled {
                    break;
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        }
    });

    let scheduler = Scheduler::new(
        Arc::new(Mutex::new(tree)),
        Arc::clone(&task_repo),
        worker,
        reviewer,
        sandboxes,
        context_collector,
        source_root,
        SchedulerOptions {
            concurrency_limit: config.scheduler.concurrency_limit,
            worker_allowed_tools: vec!["bash".to_string(), "edit".to_string(), "read".to_string()],
            worker_max_turns: config.scheduler.worker_max_turns,
        },
        control_rx,
    );

    scheduler.run().await?;
    println!("run complete for blueprint {}", blueprint.id);
    Ok(())
}
