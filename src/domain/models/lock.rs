//! Advisory file locks (spec §4.7).
//!
//! The lock directory is authoritative: lock state is never mirrored
//! into the database, only the filesystem. Grounded on the atomic-write
//! convention already used by the teacher's `infrastructure/logging/rotation.rs`
//! (write-to-temp, then rename), applied here to exclusive-create
//! instead: a lock file is acquired with `OpenOptions::create_new`,
//! which fails atomically if another holder already created it.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The on-disk contents of a lock file, used both to claim the lock and
/// to let a later acquirer decide whether a present lock is stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    /// Task that holds (or held) the lock.
    pub task_id: Uuid,
    /// OS process id of the holder, used for zombie-holder detection.
    pub pid: u32,
    /// When the lock was acquired.
    pub acquired_at: DateTime<Utc>,
}

impl LockRecord {
    #[must_use]
    pub fn new(task_id: Uuid) -> Self {
        Self {
            task_id,
            pid: std::process::id(),
            acquired_at: Utc::now(),
        }
    }
}

/// Why a lock could not be acquired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockDenialReason {
    /// Held by a live process within the timeout window.
    HeldByLiveHolder(LockRecord),
    /// Filesystem error while attempting the exclusive create.
    IoError(String),
}

/// A resolved path to a lock file plus the resource it guards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockHandle {
    /// Resource identifier the lock protects (e.g. a module id, or a
    /// path within the shared tree).
    pub resource: String,
    /// Path to the lock file on disk.
    pub path: PathBuf,
    /// The record written when this handle was acquired.
    pub record: LockRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_record_captures_current_pid() {
        let record = LockRecord::new(Uuid::new_v4());
        assert_eq!(record.pid, std::process::id());
    }
}
