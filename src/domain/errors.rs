//! Domain errors for the task orchestration engine.
//!
//! Grouped by the taxonomy in spec §7: input errors and programmer errors
//! are represented here as [`DomainError`] variants. Transient errors,
//! conflicts, and unmet preconditions are *not* error variants — they are
//! fields on result structs (see `services::sandbox::SyncBackResult`,
//! `domain::models::review::ReviewVerdict`) so they can be handled without
//! unwinding the orchestrator.

use thiserror::Error;
use uuid::Uuid;

/// Domain-level errors that can occur in the orchestration engine.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A blueprint references a module id it does not define, or a task
    /// references a module id the blueprint does not define.
    #[error("unknown module: {0}")]
    UnknownModule(String),

    /// Task dependency graph contains a cycle.
    #[error("dependency cycle detected involving task: {0}")]
    DependencyCycle(Uuid),

    /// A task's `parent_id` does not refer to a node present in the tree.
    #[error("orphaned task: {0} has no parent in the tree")]
    OrphanedTask(Uuid),

    /// Task with the given id was not found.
    #[error("task not found: {0}")]
    TaskNotFound(Uuid),

    /// Invalid status transition attempted.
    #[error("invalid state transition for task {task_id}: {from} -> {to}")]
    InvalidStateTransition {
        /// The task that was being transitioned.
        task_id: Uuid,
        /// The status it was in.
        from: String,
        /// The status that was rejected.
        to: String,
    },

    /// Invariant violation: a task reached `approved` while a dependency
    /// had not. Fatal — aborts the orchestrator per spec §7.
    #[error("invariant violated: task {0} approved with unapproved dependency {1}")]
    ApprovedWithUnapprovedDependency(Uuid, Uuid),

    /// The reviewer finished without calling the structured-output tool.
    /// Per spec §4.6 this is a hard error, never a parsed-text fallback.
    #[error("reviewer for task {0} did not emit a verdict via the structured-output tool")]
    ReviewNoVerdict(Uuid),

    /// Validation failed for a domain object before persistence.
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// Underlying storage error.
    #[error("database error: {0}")]
    DatabaseError(String),

    /// Underlying (de)serialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Optimistic-locking conflict: the entity was modified concurrently.
    #[error("concurrency conflict: {entity} {id} was modified")]
    ConcurrencyConflict {
        /// Name of the entity kind (e.g. "task").
        entity: String,
        /// Id of the conflicting entity.
        id: String,
    },

    /// Generic I/O failure outside of the sandbox/lock subsystems (which
    /// report their own per-file results instead).
    #[error("io error: {0}")]
    Io(String),
}

/// Convenience alias used throughout the domain and service layers.
pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        Self::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
