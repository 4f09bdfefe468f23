//! Implementation of `pause`, `resume`, and `cancel`: write a control
//! signal file that a running `run` process polls, since the scheduler
//! itself lives in a separate process from the CLI invocation that
//! issues these commands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use uuid::Uuid;

use crate::domain::models::config::Config;
use crate::domain::ports::TaskRepository;
use crate::infrastructure::database::{connect, SqliteTaskRepository};
use crate::services::ControlSignal;

const CONTROL_FILE_NAME: &str = "control.signal";

/// Path to the control-signal file for a project's `.abathur/` dir.
#[must_use]
pub fn control_file_path(config: &Config) -> PathBuf {
    Path::new(&config.database.path)
        .parent()
        .map_or_else(|| PathBuf::from(CONTROL_FILE_NAME), |dir| dir.join(CONTROL_FILE_NAME))
}

fn signal_to_str(signal: ControlSignal) -> &'static str {
    match signal {
        ControlSignal::Run => "run",
        ControlSignal::Paused => "paused",
        ControlSignal::Cancelled => "cancelled",
    }
}

/// Read the current control signal, defaulting to `Run` if no signal
/// file has been written yet.
///
/// # Errors
/// Propagates filesystem errors other than the file not existing.
pub fn read_control_signal(path: &Path) -> Result<ControlSignal> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(match contents.trim() {
            "paused" => ControlSignal::Paused,
            "cancelled" => ControlSignal::Cancelled,
            _ => ControlSignal::Run,
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ControlSignal::Run),
        Err(e) => Err(e).context("failed to read control signal file"),
    }
}

fn write_control_signal(config: &Config, signal: ControlSignal) -> Result<()> {
    let path = control_file_path(config);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, signal_to_str(signal)).context("failed to write control signal file")?;
    Ok(())
}

/// Pause dispatch of new work; in-flight workers run to completion.
///
/// # Errors
/// Propagates filesystem errors writing the control file.
pub fn pause(config: &Config) -> Result<()> {
    write_control_signal(config, ControlSignal::Paused)?;
    println!("pause signal sent");
    Ok(())
}

/// Resume dispatch after a pause.
///
/// # Errors
/// Propagates filesystem errors writing the control file.
pub fn resume(config: &Config) -> Result<()> {
    write_control_signal(config, ControlSignal::Run)?;
    println!("resume signal sent");
    Ok(())
}

/// Cancel a task and persist the cancellation directly (the running
/// scheduler, if any, also observes cancellation for its own run via
/// the control file, but an individual task cancel does not require a
/// whole run to be in progress).
///
/// # Errors
/// Fails if the task does not exist or the update cannot be persisted.
pub async fn cancel(config: &Config, task_id: Uuid) -> Result<()> {
    let pool = connect(Path::new(&config.database.path), config.database.max_connections).await?;
    let repo = SqliteTaskRepository::new(pool);

    let Some(mut task) = repo.get(task_id).await? else {
        anyhow::bail!("task not found: {task_id}");
    };
    let expected_version = task.version;
    task.force_status(crate::domain::models::TaskStatus::Cancelled, Some("cancelled by operator".to_string()));
    repo.update(&task, expected_version).await?;

    println!("cancelled task {task_id}");
    Ok(())
}
