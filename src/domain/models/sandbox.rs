//! Per-task sandbox state and sync-back results (spec §4.7).
//!
//! Grounded on the teacher's `services/worktree_service.rs` (lifecycle:
//! create, work, tear down) and `services/merge_queue.rs` (conflict
//! detection before merge), generalized from git-worktree-per-task to a
//! plain directory copy fingerprinted by content hash — this system has
//! no git dependency in its core path.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A content fingerprint for one file in a sandbox, used to detect
/// whether the source tree changed underneath a sandbox while a worker
/// was running in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFingerprint {
    /// Path relative to the sandbox root.
    pub relative_path: PathBuf,
    /// SHA-256 hex digest of the file contents at copy-in time.
    pub sha256_at_copy: String,
}

/// A live sandbox: an isolated copy of the project tree a worker
/// operates in, never the shared working tree directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sandbox {
    /// Task this sandbox was created for.
    pub task_id: Uuid,
    /// Absolute path to the sandbox directory.
    pub path: PathBuf,
    /// Fingerprints of every file copied in, keyed by relative path.
    pub fingerprints: HashMap<PathBuf, FileFingerprint>,
    /// When the sandbox was created.
    pub created_at: DateTime<Utc>,
}

impl Sandbox {
    #[must_use]
    pub fn new(task_id: Uuid, path: PathBuf, fingerprints: Vec<FileFingerprint>) -> Self {
        Self {
            task_id,
            path,
            fingerprints: fingerprints
                .into_iter()
                .map(|f| (f.relative_path.clone(), f))
                .collect(),
            created_at: Utc::now(),
        }
    }
}

/// One file that changed in the sandbox during the worker's run and
/// also changed in the shared tree since copy-in: a genuine conflict
/// that sync-back cannot resolve automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncBackConflict {
    /// Path relative to the project root.
    pub relative_path: PathBuf,
    /// Fingerprint recorded at copy-in time.
    pub sha256_at_copy: String,
    /// Fingerprint of the file in the shared tree at sync-back time.
    pub sha256_in_source_now: String,
    /// Fingerprint of the file as the worker left it in the sandbox.
    pub sha256_in_sandbox: String,
}

/// Outcome of merging a sandbox's changes back into the shared tree.
/// Conflicts are data, not an error: the caller (scheduler) decides
/// whether a conflicted task needs manual intervention or a retry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncBackResult {
    /// Files copied back because they changed in the sandbox and the
    /// shared tree was untouched.
    pub applied: Vec<PathBuf>,
    /// Files left alone because the worker did not modify them.
    pub unchanged: Vec<PathBuf>,
    /// Files that conflict and were NOT applied.
    pub conflicts: Vec<SyncBackConflict>,
}

impl SyncBackResult {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_back_result_is_clean_with_no_conflicts() {
        let result = SyncBackResult {
            applied: vec![PathBuf::from("src/lib.rs")],
            unchanged: vec![],
            conflicts: vec![],
        };
        assert!(result.is_clean());
    }

    #[test]
    fn sync_back_result_is_not_clean_with_conflicts() {
        let result = SyncBackResult {
            applied: vec![],
            unchanged: vec![],
            conflicts: vec![SyncBackConflict {
                relative_path: PathBuf::from("src/lib.rs"),
                sha256_at_copy: "a".into(),
                sha256_in_source_now: "b".into(),
                sha256_in_sandbox: "c".into(),
            }],
        };
        assert!(!result.is_clean());
    }
}
