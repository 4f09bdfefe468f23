//! Assembles the [`ContextBundle`] handed to a worker before it starts
//! a task (spec §4.4).
//!
//! Grounded on the teacher's `services/context_window.rs` and
//! `services/context_truncation.rs` for the cap-and-record-what-was-cut
//! pattern, using the `ignore` crate (as in the other pack examples'
//! file-discovery code) instead of a hand-rolled walker so `.gitignore`,
//! hidden directories, and vendor directories are skipped for free.

use std::path::Path;

use ignore::WalkBuilder;

use crate::domain::errors::DomainResult;
use crate::domain::models::config::ContextConfig;
use crate::domain::models::{ContextBundle, ContextFile, DependencyOutput};

/// Decision recorded in [`DESIGN.md`]: the collector never looks up a
/// task by id through a fallible stub. Dependency outputs are passed in
/// directly by the caller (the scheduler already holds the full `Task`
/// for every declared dependency), closing the gap the reference
/// implementation left open.
#[derive(Debug, Clone)]
pub struct ContextCollector {
    config: ContextConfig,
}

impl ContextCollector {
    #[must_use]
    pub fn new(config: ContextConfig) -> Self {
        Self { config }
    }

    /// Walk `sandbox_root`, gather up to `max_files` regular files under
    /// `max_file_size`, and combine them with the already-collected
    /// `dependency_outputs` into a single bundle.
    ///
    /// # Errors
    /// Propagates filesystem errors from walking or reading files.
    pub async fn collect(
        &self,
        sandbox_root: &Path,
        dependency_outputs: Vec<DependencyOutput>,
    ) -> DomainResult<ContextBundle> {
        let config = self.config.clone();
        let root = sandbox_root.to_path_buf();
        let (files, omitted) =
            tokio::task::spawn_blocking(move || Self::walk(&root, &config))
                .await
                .map_err(|e| crate::domain::errors::DomainError::Io(e.to_string()))??;

        Ok(ContextBundle {
            files,
            dependency_outputs,
            omitted,
        })
    }

    fn walk(
        root: &Path,
        config: &ContextConfig,
    ) -> DomainResult<(Vec<ContextFile>, Vec<std::path::PathBuf>)> {
        let mut files = Vec::new();
        let mut omitted = Vec::new();

        let walker = WalkBuilder::new(root)
            .hidden(true)
            .git_ignore(true)
            .git_global(false)
            .git_exclude(false)
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(_) => continue,
            };
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();

            if !config.include_test_files && is_test_path(&relative) {
                continue;
            }

            let metadata = match std::fs::metadata(path) {
                Ok(m) => m,
                Err(_) => continue,
            };

            if files.len() >= config.max_files {
                omitted.push(relative);
                continue;
            }
            if metadata.len() > config.max_file_size {
                omitted.push(relative);
                continue;
            }

            let Ok(contents) = std::fs::read_to_string(path) else {
                omitted.push(relative);
                continue;
            };

            files.push(ContextFile {
                relative_path: relative,
                contents,
                truncated: false,
            });
        }

        Ok((files, omitted))
    }
}

fn is_test_path(path: &Path) -> bool {
    path.components().any(|c| {
        let s = c.as_os_str().to_string_lossy();
        s == "tests" || s == "test"
    }) || path
        .file_stem()
        .map(|s| s.to_string_lossy().ends_with("_test") || s.to_string_lossy().starts_with("test_"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn collects_files_up_to_max_files() {
        let dir = tempdir().unwrap();
        for i in 0..5 {
            tokio::fs::write(dir.path().join(format!("f{i}.rs")), b"content").await.unwrap();
        }
        let collector = ContextCollector::new(ContextConfig {
            max_files: 3,
            ..ContextConfig::default()
        });
        let bundle = collector.collect(dir.path(), vec![]).await.unwrap();
        assert_eq!(bundle.files.len(), 3);
        assert_eq!(bundle.omitted.len(), 2);
    }

    #[tokio::test]
    async fn excludes_test_files_when_configured() {
        let dir = tempdir().unwrap();
        tokio::fs::write(dir.path().join("lib.rs"), b"pub fn x() {}").await.unwrap();
        tokio::fs::create_dir(dir.path().join("tests")).await.unwrap();
        tokio::fs::write(dir.path().join("tests/it.rs"), b"#[test] fn y() {}").await.unwrap();

        let collector = ContextCollector::new(ContextConfig {
            include_test_files: false,
            ..ContextConfig::default()
        });
        let bundle = collector.collect(dir.path(), vec![]).await.unwrap();
        assert_eq!(bundle.files.len(), 1);
        assert_eq!(bundle.files[0].relative_path, Path::new("lib.rs"));
    }
}
