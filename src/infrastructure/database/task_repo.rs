//! `SQLite`-backed [`TaskRepository`].
//!
//! Grounded on the teacher's `infrastructure/database/task_repo.rs` row
//! mapping style (`Row::get` plus JSON-encoded `Vec`/enum fields,
//! `parse_datetime` via chrono), rewritten field-for-field against this
//! system's `Task` shape — the teacher's copy targeted an older,
//! inconsistent `Task` definition not present in `domain::models::task`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Checkpoint, Task, TaskSource, TaskStatus};
use crate::domain::ports::TaskRepository;

/// Implements [`TaskRepository`] against a `SqlitePool`.
pub struct SqliteTaskRepository {
    pool: SqlitePool,
}

impl SqliteTaskRepository {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn status_to_str(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Blocked => "blocked",
        TaskStatus::Pending => "pending",
        TaskStatus::TestWriting => "test_writing",
        TaskStatus::Coding => "coding",
        TaskStatus::Testing => "testing",
        TaskStatus::TestFailed => "test_failed",
        TaskStatus::Passed => "passed",
        TaskStatus::Approved => "approved",
        TaskStatus::Rejected => "rejected",
        TaskStatus::Cancelled => "cancelled",
    }
}

fn status_from_str(raw: &str) -> DomainResult<TaskStatus> {
    Ok(match raw {
        "blocked" => TaskStatus::Blocked,
        "pending" => TaskStatus::Pending,
        "test_writing" => TaskStatus::TestWriting,
        "coding" => TaskStatus::Coding,
        "testing" => TaskStatus::Testing,
        "test_failed" => TaskStatus::TestFailed,
        "passed" => TaskStatus::Passed,
        "approved" => TaskStatus::Approved,
        "rejected" => TaskStatus::Rejected,
        "cancelled" => TaskStatus::Cancelled,
        other => return Err(DomainError::ValidationFailed(format!("unknown task status: {other}"))),
    })
}

fn row_to_task(row: &sqlx::sqlite::SqliteRow) -> DomainResult<Task> {
    let depends_on: String = row.try_get("depends_on")?;
    let source: String = row.try_get("source")?;
    let acceptance_tests: String = row.try_get("acceptance_tests")?;
    let checkpoints: String = row.try_get("checkpoints")?;
    let status: String = row.try_get("status")?;
    let parent_id: Option<String> = row.try_get("parent_id")?;

    Ok(Task {
        id: Uuid::parse_str(&row.try_get::<String, _>("id")?)
            .map_err(|e| DomainError::SerializationError(e.to_string()))?,
        blueprint_id: Uuid::parse_str(&row.try_get::<String, _>("blueprint_id")?)
            .map_err(|e| DomainError::SerializationError(e.to_string()))?,
        module_id: row.try_get("module_id")?,
        parent_id: parent_id
            .map(|s| Uuid::parse_str(&s))
            .transpose()
            .map_err(|e| DomainError::SerializationError(e.to_string()))?,
        depends_on: serde_json::from_str::<Vec<Uuid>>(&depends_on)?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        status: status_from_str(&status)?,
        source: serde_json::from_str::<TaskSource>(&source)?,
        depth: u32::try_from(row.try_get::<i64, _>("depth")?).unwrap_or(0),
        acceptance_tests: serde_json::from_str::<Vec<String>>(&acceptance_tests)?,
        test_spec: row.try_get("test_spec")?,
        checkpoints: serde_json::from_str::<Vec<Checkpoint>>(&checkpoints)?,
        retry_count: u32::try_from(row.try_get::<i64, _>("retry_count")?).unwrap_or(0),
        max_retries: u32::try_from(row.try_get::<i64, _>("max_retries")?).unwrap_or(0),
        idempotency_key: row.try_get("idempotency_key")?,
        version: row.try_get("version")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    async fn create(&self, task: &Task) -> DomainResult<()> {
        let depends_on = serde_json::to_string(&task.depends_on)?;
        let source = serde_json::to_string(&task.source)?;
        let acceptance_tests = serde_json::to_string(&task.acceptance_tests)?;
        let checkpoints = serde_json::to_string(&task.checkpoints)?;

        sqlx::query(
            r"
            INSERT INTO tasks (
                id, blueprint_id, module_id, parent_id, depends_on, title, description,
                status, source, depth, acceptance_tests, test_spec, checkpoints,
                retry_count, max_retries, idempotency_key, version, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(task.id.to_string())
        .bind(task.blueprint_id.to_string())
        .bind(&task.module_id)
        .bind(task.parent_id.map(|id| id.to_string()))
        .bind(depends_on)
        .bind(&task.title)
        .bind(&task.description)
        .bind(status_to_str(task.status))
        .bind(source)
        .bind(i64::from(task.depth))
        .bind(acceptance_tests)
        .bind(&task.test_spec)
        .bind(checkpoints)
        .bind(i64::from(task.retry_count))
        .bind(i64::from(task.max_retries))
        .bind(&task.idempotency_key)
        .bind(task.version)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await
        .map_err(DomainError::from)?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Task>> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(DomainError::from)?;

        row.as_ref().map(row_to_task).transpose()
    }

    async fn update(&self, task: &Task, expected_version: i64) -> DomainResult<()> {
        let depends_on = serde_json::to_string(&task.depends_on)?;
        let acceptance_tests = serde_json::to_string(&task.acceptance_tests)?;
        let checkpoints = serde_json::to_string(&task.checkpoints)?;

        let result = sqlx::query(
            r"
            UPDATE tasks SET
                status = ?, depends_on = ?, acceptance_tests = ?, test_spec = ?,
                checkpoints = ?, retry_count = ?, version = ?, updated_at = ?
            WHERE id = ? AND version = ?
            ",
        )
        .bind(status_to_str(task.status))
        .bind(depends_on)
        .bind(acceptance_tests)
        .bind(&task.test_spec)
        .bind(checkpoints)
        .bind(i64::from(task.retry_count))
        .bind(task.version)
        .bind(task.updated_at)
        .bind(task.id.to_string())
        .bind(expected_version)
        .execute(&self.pool)
        .await
        .map_err(DomainError::from)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::ConcurrencyConflict {
                entity: "task".to_string(),
                id: task.id.to_string(),
            });
        }
        Ok(())
    }

    async fn list_by_blueprint(&self, blueprint_id: Uuid) -> DomainResult<Vec<Task>> {
        let rows = sqlx::query("SELECT * FROM tasks WHERE blueprint_id = ?")
            .bind(blueprint_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(DomainError::from)?;

        rows.iter().map(row_to_task).collect()
    }

    async fn find_by_idempotency_key(&self, key: &str) -> DomainResult<Option<Task>> {
        let row = sqlx::query("SELECT * FROM tasks WHERE idempotency_key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(DomainError::from)?;

        row.as_ref().map(row_to_task).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::connection::connect;

    async fn in_memory_repo() -> SqliteTaskRepository {
        let pool = connect(std::path::Path::new(":memory:"), 1).await.unwrap();
        SqliteTaskRepository::new(pool)
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let repo = in_memory_repo().await;
        let task = Task::new(Uuid::new_v4(), "core", "t", "d", vec![], 0);
        repo.create(&task).await.unwrap();

        let fetched = repo.get(task.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, task.id);
        assert_eq!(fetched.title, "t");
        assert_eq!(fetched.status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn update_rejects_stale_version() {
        let repo = in_memory_repo().await;
        let mut task = Task::new(Uuid::new_v4(), "core", "t", "d", vec![], 0);
        repo.create(&task).await.unwrap();

        let stale_version = task.version;
        task.transition_to(TaskStatus::TestWriting, None).unwrap();
        repo.update(&task, stale_version).await.unwrap();

        task.transition_to(TaskStatus::Coding, None).unwrap();
        let err = repo.update(&task, stale_version).await.unwrap_err();
        assert!(matches!(err, DomainError::ConcurrencyConflict { .. }));
    }

    #[tokio::test]
    async fn find_by_idempotency_key_finds_created_task() {
        let repo = in_memory_repo().await;
        let task = Task::new(Uuid::new_v4(), "core", "t", "d", vec![], 0);
        repo.create(&task).await.unwrap();

        let found = repo
            .find_by_idempotency_key(&task.idempotency_key)
            .await
            .unwrap();
        assert!(found.is_some());
    }
}
