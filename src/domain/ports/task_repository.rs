//! Port for persisting tasks.
//!
//! Grounded on the teacher's `domain/ports` trait-per-aggregate style:
//! an async trait object-safe enough to be held behind an `Arc<dyn _>`
//! in the service layer, implemented concretely by
//! `infrastructure::database::task_repo::SqliteTaskRepository`.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::Task;

/// Persists and retrieves [`Task`]s.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Insert a new task.
    async fn create(&self, task: &Task) -> DomainResult<()>;

    /// Fetch a task by id.
    async fn get(&self, id: Uuid) -> DomainResult<Option<Task>>;

    /// Persist an updated task, enforcing optimistic concurrency on
    /// `version`: the update is rejected if the stored version does not
    /// match `expected_version`.
    async fn update(&self, task: &Task, expected_version: i64) -> DomainResult<()>;

    /// All tasks for a blueprint, used to rebuild a [`crate::domain::models::TaskTree`]
    /// on startup/resume.
    async fn list_by_blueprint(&self, blueprint_id: Uuid) -> DomainResult<Vec<Task>>;

    /// Find a task by its idempotency key, used to avoid double-creating
    /// a task when replaying after a crash.
    async fn find_by_idempotency_key(&self, key: &str) -> DomainResult<Option<Task>>;
}
