//! Command-line interface (spec §6): `init`, `run`, `adjust`, `pause`,
//! `resume`, `cancel`, and `task` subcommands.

pub mod commands;
pub mod display;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use uuid::Uuid;

/// Autonomous multi-agent software-engineering task orchestration engine.
#[derive(Debug, Parser)]
#[command(name = "abathur-orch", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Initialize `.abathur/` in the current project.
    Init {
        /// Overwrite existing config/database if present.
        #[arg(long)]
        force: bool,
    },

    /// Start (or resume) orchestration for a blueprint.
    Run {
        /// Path to a blueprint YAML/JSON file describing the system to build.
        #[arg(long)]
        blueprint: PathBuf,

        /// Root of the project tree sandboxes are copied from/synced back to.
        #[arg(long, default_value = ".")]
        source_root: PathBuf,
    },

    /// Dry-run the granularity controller over the current run's task
    /// tree: print scores, split suggestions, merge suggestions, and
    /// structural diagnostics without changing anything.
    Adjust,

    /// Pause dispatch of new work. In-flight workers run to completion.
    Pause,

    /// Resume dispatch after a pause.
    Resume,

    /// Cancel a task (and, transitively, anything depending on it).
    Cancel {
        /// Task id to cancel.
        task_id: Uuid,
    },

    /// Inspect tasks.
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum TaskAction {
    /// List all tasks in the current run as a table.
    List,
    /// Show one task's full detail, including checkpoint history.
    Show {
        /// Task id to show.
        task_id: Uuid,
    },
    /// Show the task tree.
    Tree,
}
