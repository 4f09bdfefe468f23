//! Port for the git capability surfaced to agents (spec §2's
//! "collaborator services" boundary — this system shells out to the
//! host's git for log/status only; it never drives git itself for
//! sandbox isolation, see [`crate::services::sandbox`]).

use async_trait::async_trait;
use std::path::Path;

use crate::domain::errors::DomainResult;

/// One line of `git log --oneline` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub short_hash: String,
    pub summary: String,
}

/// Read-only git introspection used to enrich context bundles with
/// recent history, without giving agents direct git-mutation access.
#[async_trait]
pub trait GitCapability: Send + Sync {
    /// The last `n` commits touching `path`.
    async fn log(&self, path: &Path, n: usize) -> DomainResult<Vec<LogEntry>>;

    /// Working-tree status lines (`git status --porcelain`) for `path`.
    async fn status(&self, path: &Path) -> DomainResult<Vec<String>>;
}
