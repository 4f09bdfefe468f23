//! Orchestrator configuration.
//!
//! Mirrors the option table in spec §6. Loaded and layered by
//! `infrastructure::config::ConfigLoader` (figment: defaults → project
//! YAML → local YAML → env vars).

use serde::{Deserialize, Serialize};

/// Root configuration structure for the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Granularity controller bands and weights.
    #[serde(default)]
    pub granularity: GranularityConfig,

    /// Context collector limits.
    #[serde(default)]
    pub context: ContextConfig,

    /// Reviewer behavior.
    #[serde(default)]
    pub reviewer: ReviewerConfig,

    /// Scheduler concurrency.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Sandbox/lock manager paths and timeouts.
    #[serde(default)]
    pub sandbox: SandboxConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            granularity: GranularityConfig::default(),
            context: ContextConfig::default(),
            reviewer: ReviewerConfig::default(),
            scheduler: SchedulerConfig::default(),
            sandbox: SandboxConfig::default(),
        }
    }
}

/// `SQLite` database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to the `SQLite` database file.
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".abathur/orchestrator.db".to_string()
}

const fn default_max_connections() -> u32 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration (bridges to `infrastructure::logging::LogConfig`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty.
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Number of days to retain rotated logs and persisted tool output.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

const fn default_retention_days() -> u32 {
    7
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            retention_days: default_retention_days(),
        }
    }
}

/// Granularity controller bands, weights, and structural constraints
/// (spec §4.1, exposed via spec §6's option table).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GranularityConfig {
    /// Minimum complexity score below which a task is a merge candidate.
    #[serde(default = "default_min_complexity")]
    pub min_task_complexity: f64,

    /// Maximum complexity score above which a task should split.
    #[serde(default = "default_max_complexity")]
    pub max_task_complexity: f64,

    /// Ideal duration in minutes, used as the sigmoid midpoint input.
    #[serde(default = "default_ideal_duration")]
    pub ideal_task_duration: f64,

    /// Minimum acceptable estimated duration in minutes.
    #[serde(default = "default_min_duration")]
    pub min_task_duration: f64,

    /// Maximum acceptable estimated duration in minutes before a split.
    #[serde(default = "default_max_duration")]
    pub max_task_duration: f64,

    /// Maximum tree depth.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Minimum tree depth before a complex leaf must split.
    #[serde(default = "default_min_depth")]
    pub min_depth: u32,

    /// Maximum children per node before a split/merge-size trigger fires.
    #[serde(default = "default_max_children")]
    pub max_children_per_node: usize,

    /// Minimum children per node (informational; used in diagnostics).
    #[serde(default = "default_min_children")]
    pub min_children_per_node: usize,

    /// Baseline lines-per-task used for the sigmoid line estimate.
    #[serde(default = "default_estimated_lines")]
    pub estimated_lines_per_task: f64,

    /// Upper calibration bound for line estimates.
    #[serde(default = "default_max_lines")]
    pub max_lines_per_task: f64,

    /// Lower calibration bound for line estimates.
    #[serde(default = "default_min_lines")]
    pub min_lines_per_task: f64,
}

const fn default_min_complexity() -> f64 {
    15.0
}
const fn default_max_complexity() -> f64 {
    75.0
}
const fn default_ideal_duration() -> f64 {
    30.0
}
const fn default_min_duration() -> f64 {
    5.0
}
const fn default_max_duration() -> f64 {
    120.0
}
const fn default_max_depth() -> u32 {
    5
}
const fn default_min_depth() -> u32 {
    1
}
const fn default_max_children() -> usize {
    8
}
const fn default_min_children() -> usize {
    2
}
const fn default_estimated_lines() -> f64 {
    100.0
}
const fn default_max_lines() -> f64 {
    400.0
}
const fn default_min_lines() -> f64 {
    20.0
}

impl Default for GranularityConfig {
    fn default() -> Self {
        Self {
            min_task_complexity: default_min_complexity(),
            max_task_complexity: default_max_complexity(),
            ideal_task_duration: default_ideal_duration(),
            min_task_duration: default_min_duration(),
            max_task_duration: default_max_duration(),
            max_depth: default_max_depth(),
            min_depth: default_min_depth(),
            max_children_per_node: default_max_children(),
            min_children_per_node: default_min_children(),
            estimated_lines_per_task: default_estimated_lines(),
            max_lines_per_task: default_max_lines(),
            min_lines_per_task: default_min_lines(),
        }
    }
}

/// Context collector limits (spec §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ContextConfig {
    /// Maximum number of files attached to a context bundle.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Maximum size in bytes of a single file considered for inclusion.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Maximum characters retained per dependency-output file.
    #[serde(default = "default_max_dep_chars")]
    pub max_dependency_file_chars: usize,

    /// Maximum number of dependency-output files per upstream task.
    #[serde(default = "default_max_dep_files")]
    pub max_dependency_files: usize,

    /// Whether test files may be gathered as context.
    #[serde(default = "default_true")]
    pub include_test_files: bool,
}

const fn default_max_files() -> usize {
    10
}
const fn default_max_file_size() -> u64 {
    100 * 1024
}
const fn default_max_dep_chars() -> usize {
    5000
}
const fn default_max_dep_files() -> usize {
    5
}
const fn default_true() -> bool {
    true
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            max_file_size: default_max_file_size(),
            max_dependency_file_chars: default_max_dep_chars(),
            max_dependency_files: default_max_dep_files(),
            include_test_files: default_true(),
        }
    }
}

/// Reviewer behavior (spec §4.6, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReviewerConfig {
    /// Whether independent review is enabled at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Model/agent-type identifier passed to the agent runner.
    #[serde(default = "default_reviewer_model")]
    pub model: String,

    /// Strictness guide: lenient, normal, or strict.
    #[serde(default = "default_strictness")]
    pub strictness: ReviewStrictness,

    /// Maximum retries before a failing task is rejected.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Review timeout in milliseconds.
    #[serde(default = "default_reviewer_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum agent turns the reviewer may take.
    #[serde(default = "default_reviewer_max_turns")]
    pub max_turns: u32,
}

fn default_reviewer_model() -> String {
    "default".to_string()
}
const fn default_strictness() -> ReviewStrictness {
    ReviewStrictness::Normal
}
const fn default_max_retries() -> u32 {
    3
}
const fn default_reviewer_timeout_ms() -> u64 {
    60_000
}
const fn default_reviewer_max_turns() -> u32 {
    12
}

impl Default for ReviewerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            model: default_reviewer_model(),
            strictness: default_strictness(),
            max_retries: default_max_retries(),
            timeout_ms: default_reviewer_timeout_ms(),
            max_turns: default_reviewer_max_turns(),
        }
    }
}

/// Review strictness, controlling the one-line instruction injected into
/// the reviewer's prompt (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStrictness {
    /// Give the benefit of the doubt on ambiguous cases.
    Lenient,
    /// Default balance of thoroughness and throughput.
    Normal,
    /// Flag anything that isn't unambiguously correct.
    Strict,
}

impl ReviewStrictness {
    /// The one-line instruction injected into the reviewer's initial
    /// prompt for this strictness level.
    pub fn instruction(self) -> &'static str {
        match self {
            Self::Lenient => {
                "Pass the task unless there is a clear, demonstrable defect."
            }
            Self::Normal => {
                "Pass the task if it satisfies the acceptance criteria and contains no obvious defects."
            }
            Self::Strict => {
                "Flag anything that is not unambiguously correct, including style and robustness concerns."
            }
        }
    }
}

/// Scheduler concurrency (spec §4.3, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SchedulerConfig {
    /// Maximum number of simultaneously running workers.
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,

    /// Maximum agent turns a worker may take.
    #[serde(default = "default_worker_max_turns")]
    pub worker_max_turns: u32,
}

const fn default_concurrency_limit() -> usize {
    4
}
const fn default_worker_max_turns() -> u32 {
    60
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: default_concurrency_limit(),
            worker_max_turns: default_worker_max_turns(),
        }
    }
}

/// Sandbox and lock manager paths/timeouts (spec §4.7, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SandboxConfig {
    /// Root directory under which per-worker sandboxes are created.
    /// Defaults to a project-local cache directory.
    #[serde(default = "default_sandbox_base_dir")]
    pub base_dir: String,

    /// Directory holding on-disk lock files.
    #[serde(default = "default_lock_dir")]
    pub lock_dir: String,

    /// Lock acquisition timeout in milliseconds.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_sandbox_base_dir() -> String {
    ".abathur/sandboxes".to_string()
}

fn default_lock_dir() -> String {
    ".abathur/locks".to_string()
}

const fn default_lock_timeout_ms() -> u64 {
    60_000
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            base_dir: default_sandbox_base_dir(),
            lock_dir: default_lock_dir(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}
