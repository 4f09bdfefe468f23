//! `SQLite` connection pool setup and migrations.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};

/// Open a connection pool against the database at `path`, creating it
/// (and its parent directory) if necessary, then apply migrations.
///
/// # Errors
/// [`DomainError::DatabaseError`] if the pool cannot be established or
/// migrations fail.
pub async fn connect(path: &Path, max_connections: u32) -> DomainResult<SqlitePool> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .map_err(|e| DomainError::DatabaseError(e.to_string()))?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| DomainError::DatabaseError(e.to_string()))?;

    Ok(pool)
}
