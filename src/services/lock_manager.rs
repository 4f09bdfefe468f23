//! Advisory file locking over shared-tree resources (spec §4.7).
//!
//! The lock directory is authoritative — lock state lives only on disk,
//! never in the database. Acquisition uses `OpenOptions::create_new`,
//! which atomically fails if a lock file already exists; staleness is
//! resolved by checking whether the recorded pid is still alive (via
//! `nix`'s zero-signal liveness probe) or whether the lock has simply
//! outlived its timeout.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use nix::sys::signal::kill;
use nix::unistd::Pid;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{LockHandle, LockRecord};

/// Manages advisory locks under a single lock directory.
#[derive(Debug, Clone)]
pub struct LockManager {
    lock_dir: PathBuf,
    timeout: Duration,
}

impl LockManager {
    #[must_use]
    pub fn new(lock_dir: PathBuf, timeout: Duration) -> Self {
        Self { lock_dir, timeout }
    }

    fn lock_path(&self, resource: &str) -> PathBuf {
        self.lock_dir.join(format!("{resource}.lock"))
    }

    /// Acquire a lock on `resource` for `task_id`, blocking (via async
    /// polling) until it is free or the timeout elapses.
    ///
    /// # Errors
    /// [`DomainError::Io`] if the lock directory cannot be created, or
    /// if the lock remains held by a live holder past the timeout.
    pub async fn acquire(&self, resource: &str, task_id: Uuid) -> DomainResult<LockHandle> {
        fs::create_dir_all(&self.lock_dir)?;
        let path = self.lock_path(resource);
        let deadline = tokio::time::Instant::now() + self.timeout;

        loop {
            match self.try_create(&path, task_id) {
                Ok(record) => {
                    return Ok(LockHandle {
                        resource: resource.to_string(),
                        path,
                        record,
                    });
                }
                Err(TryCreateError::Held(existing)) => {
                    if self.is_stale(&existing) {
                        warn!(resource, holder_pid = existing.pid, "clearing stale lock");
                        let _ = fs::remove_file(&path);
                        continue;
                    }
                    if tokio::time::Instant::now() >= deadline {
                        return Err(DomainError::Io(format!(
                            "timed out acquiring lock on {resource}, held by pid {}",
                            existing.pid
                        )));
                    }
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
                Err(TryCreateError::Io(e)) => return Err(DomainError::Io(e.to_string())),
            }
        }
    }

    fn try_create(&self, path: &Path, task_id: Uuid) -> Result<LockRecord, TryCreateError> {
        let record = LockRecord::new(task_id);
        match fs::OpenOptions::new().create_new(true).write(true).open(path) {
            Ok(mut file) => {
                let body = serde_json::to_vec(&record).map_err(|e| {
                    TryCreateError::Io(std::io::Error::new(std::io::ErrorKind::Other, e))
                })?;
                file.write_all(&body).map_err(TryCreateError::Io)?;
                Ok(record)
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                match fs::read(path) {
                    Ok(bytes) => match serde_json::from_slice::<LockRecord>(&bytes) {
                        Ok(existing) => Err(TryCreateError::Held(existing)),
                        // A lock file that can't be parsed is treated as
                        // stale and safe to overwrite on the next pass.
                        Err(_) => {
                            let _ = fs::remove_file(path);
                            Err(TryCreateError::Io(std::io::Error::new(
                                std::io::ErrorKind::InvalidData,
                                "corrupt lock file cleared",
                            )))
                        }
                    },
                    Err(read_err) => Err(TryCreateError::Io(read_err)),
                }
            }
            Err(e) => Err(TryCreateError::Io(e)),
        }
    }

    fn is_stale(&self, record: &LockRecord) -> bool {
        let age = chrono::Utc::now().signed_duration_since(record.acquired_at);
        let age_exceeds_timeout = age.num_milliseconds()
            > i64::try_from(self.timeout.as_millis()).unwrap_or(i64::MAX);
        if age_exceeds_timeout {
            return true;
        }
        !Self::holder_is_alive(record.pid)
    }

    fn holder_is_alive(pid: u32) -> bool {
        match i32::try_from(pid) {
            Ok(pid) => kill(Pid::from_raw(pid), None).is_ok(),
            Err(_) => false,
        }
    }

    /// Release a previously acquired lock.
    ///
    /// # Errors
    /// [`DomainError::Io`] if the lock file cannot be removed.
    pub fn release(&self, handle: &LockHandle) -> DomainResult<()> {
        if handle.path.exists() {
            fs::remove_file(&handle.path)?;
        }
        debug!(resource = %handle.resource, "released lock");
        Ok(())
    }
}

enum TryCreateError {
    Held(LockRecord),
    Io(std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn acquire_then_release_allows_reacquire() {
        let dir = tempdir().unwrap();
        let manager = LockManager::new(dir.path().to_path_buf(), Duration::from_millis(500));
        let task_id = Uuid::new_v4();

        let handle = manager.acquire("module-a", task_id).await.unwrap();
        manager.release(&handle).unwrap();

        let handle2 = manager.acquire("module-a", task_id).await.unwrap();
        assert_eq!(handle2.resource, "module-a");
    }

    #[tokio::test]
    async fn second_acquire_times_out_while_first_holds() {
        let dir = tempdir().unwrap();
        let manager = LockManager::new(dir.path().to_path_buf(), Duration::from_millis(100));
        let holder_task = Uuid::new_v4();
        let _handle = manager.acquire("module-b", holder_task).await.unwrap();

        let waiter_task = Uuid::new_v4();
        let result = manager.acquire("module-b", waiter_task).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn stale_lock_from_dead_pid_is_reclaimed() {
        let dir = tempdir().unwrap();
        let manager = LockManager::new(dir.path().to_path_buf(), Duration::from_secs(60));
        let path = manager.lock_path("module-c");
        let fake = LockRecord {
            task_id: Uuid::new_v4(),
            pid: 999_999, // unlikely to be a live pid in the test sandbox
            acquired_at: chrono::Utc::now(),
        };
        fs::write(&path, serde_json::to_vec(&fake).unwrap()).unwrap();

        let task_id = Uuid::new_v4();
        let handle = manager.acquire("module-c", task_id).await.unwrap();
        assert_eq!(handle.record.task_id, task_id);
    }
}
