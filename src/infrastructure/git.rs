//! Shells out to the host `git` binary for read-only log/status
//! queries, implementing [`GitCapability`].

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::git::{GitCapability, LogEntry};

#[derive(Debug, Clone, Default)]
pub struct ShellGitCapability;

#[async_trait]
impl GitCapability for ShellGitCapability {
    async fn log(&self, path: &Path, n: usize) -> DomainResult<Vec<LogEntry>> {
        let output = Command::new("git")
            .arg("-C")
            .arg(path)
            .arg("log")
            .arg(format!("-{n}"))
            .arg("--oneline")
            .output()
            .await
            .map_err(|e| DomainError::Io(format!("failed to run git log: {e}")))?;

        if !output.status.success() {
            return Err(DomainError::Io(String::from_utf8_lossy(&output.stderr).to_string()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout
            .lines()
            .filter_map(|line| {
                let (hash, summary) = line.split_once(' ')?;
                Some(LogEntry {
                    short_hash: hash.to_string(),
                    summary: summary.to_string(),
                })
            })
            .collect())
    }

    async fn status(&self, path: &Path) -> DomainResult<Vec<String>> {
        let output = Command::new("git")
            .arg("-C")
            .arg(path)
            .arg("status")
            .arg("--porcelain")
            .output()
            .await
            .map_err(|e| DomainError::Io(format!("failed to run git status: {e}")))?;

        if !output.status.success() {
            return Err(DomainError::Io(String::from_utf8_lossy(&output.stderr).to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect())
    }
}
