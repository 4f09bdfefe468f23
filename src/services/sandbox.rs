//! Sandbox lifecycle: copy-in, sync-back, conflict detection (spec §4.7).
//!
//! Grounded on the teacher's `services/worktree_service.rs` for the
//! create/work/teardown lifecycle shape and `services/merge_queue.rs`
//! for checking conflicts before merging, generalized from git
//! worktrees to a plain recursive directory copy with SHA-256
//! fingerprints recorded at copy-in time.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{FileFingerprint, Sandbox, SyncBackConflict, SyncBackResult};

/// Creates and tears down per-task sandboxes under a configured base
/// directory.
#[derive(Debug, Clone)]
pub struct SandboxManager {
    base_dir: PathBuf,
}

impl SandboxManager {
    #[must_use]
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    fn sandbox_dir(&self, task_id: Uuid) -> PathBuf {
        self.base_dir.join(task_id.to_string())
    }

    /// Recursively copy `source_root` into a fresh sandbox directory for
    /// `task_id`, recording a fingerprint of every regular file copied.
    ///
    /// # Errors
    /// Propagates filesystem errors from walking or copying the tree.
    pub async fn copy_in(&self, task_id: Uuid, source_root: &Path) -> DomainResult<Sandbox> {
        let dest_root = self.sandbox_dir(task_id);
        tokio::fs::create_dir_all(&dest_root).await?;

        let mut fingerprints = Vec::new();
        copy_tree(source_root, source_root, &dest_root, &mut fingerprints).await?;

        Ok(Sandbox::new(task_id, dest_root, fingerprints))
    }

    /// Copy every file that changed inside the sandbox back into
    /// `source_root`, unless the corresponding source file also changed
    /// since copy-in (a genuine conflict, left unapplied).
    ///
    /// # Errors
    /// Propagates filesystem errors; conflicts are reported in the
    /// returned [`SyncBackResult`], not as an `Err`.
    pub async fn sync_back(
        &self,
        sandbox: &Sandbox,
        source_root: &Path,
    ) -> DomainResult<SyncBackResult> {
        let mut result = SyncBackResult::default();

        let mut current_sandbox_files = Vec::new();
        collect_regular_files(&sandbox.path, &sandbox.path, &mut current_sandbox_files).await?;

        for relative in current_sandbox_files {
            let sandbox_path = sandbox.path.join(&relative);
            let sandbox_hash = hash_file(&sandbox_path).await?;

            let recorded = sandbox.fingerprints.get(&relative);
            let unchanged_in_sandbox = recorded
                .map(|f| f.sha256_at_copy == sandbox_hash)
                .unwrap_or(false);

            if unchanged_in_sandbox {
                result.unchanged.push(relative);
                continue;
            }

            let source_path = source_root.join(&relative);
            let source_hash_now = if source_path.exists() {
                Some(hash_file(&source_path).await?)
            } else {
                None
            };

            let source_changed_since_copy = match (&recorded, &source_hash_now) {
                (Some(f), Some(now)) => f.sha256_at_copy != *now,
                (None, Some(_)) => true, // file didn't exist at copy-in, now it does
                (_, None) => false,
            };

            if source_changed_since_copy {
                result.conflicts.push(SyncBackConflict {
                    relative_path: relative,
                    sha256_at_copy: recorded.map_or_else(String::new, |f| f.sha256_at_copy.clone()),
                    sha256_in_source_now: source_hash_now.unwrap_or_default(),
                    sha256_in_sandbox: sandbox_hash,
                });
                continue;
            }

            if let Some(parent) = source_path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::copy(&sandbox_path, &source_path).await?;
            result.applied.push(relative);
        }

        Ok(result)
    }

    /// Remove a sandbox directory entirely once the task is done with it.
    ///
    /// # Errors
    /// Propagates filesystem errors; a missing directory is not an error.
    pub async fn teardown(&self, task_id: Uuid) -> DomainResult<()> {
        let dir = self.sandbox_dir(task_id);
        if dir.exists() {
            tokio::fs::remove_dir_all(dir).await?;
        }
        Ok(())
    }
}

async fn hash_file(path: &Path) -> DomainResult<String> {
    let bytes = tokio::fs::read(path).await?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

async fn collect_regular_files(
    root: &Path,
    dir: &Path,
    out: &mut Vec<PathBuf>,
) -> DomainResult<()> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let file_type = entry.file_type().await?;
        if file_type.is_dir() {
            if path.file_name().and_then(|n| n.to_str()) == Some(".git") {
                continue;
            }
            Box::pin(collect_regular_files(root, &path, out)).await?;
        } else if file_type.is_file() {
            if let Ok(relative) = path.strip_prefix(root) {
                out.push(relative.to_path_buf());
            }
        }
    }
    Ok(())
}

async fn copy_tree(
    root: &Path,
    dir: &Path,
    dest_root: &Path,
    fingerprints: &mut Vec<FileFingerprint>,
) -> DomainResult<()> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let file_type = entry.file_type().await?;
        if file_type.is_dir() {
            if path.file_name().and_then(|n| n.to_str()) == Some(".git") {
                continue;
            }
            Box::pin(copy_tree(root, &path, dest_root, fingerprints)).await?;
        } else if file_type.is_file() {
            let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
            let dest_path = dest_root.join(&relative);
            if let Some(parent) = dest_path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::copy(&path, &dest_path).await?;
            let hash = hash_file(&dest_path).await?;
            fingerprints.push(FileFingerprint {
                relative_path: relative,
                sha256_at_copy: hash,
            });
        }
    }
    Ok(())
}
