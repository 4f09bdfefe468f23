//! Context bundles assembled for a worker before it starts a task
//! (spec §4.4).
//!
//! Grounded on the teacher's `services/context_window.rs` and
//! `services/context_truncation.rs`: both cap how much material is
//! handed to an agent and record what was left out rather than
//! silently dropping it.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One file attached to a context bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextFile {
    /// Path relative to the sandbox root.
    pub relative_path: PathBuf,
    /// File contents, possibly truncated (see `truncated`).
    pub contents: String,
    /// Whether `contents` was cut short to respect `max_file_size`.
    pub truncated: bool,
}

/// The recorded output of a dependency task, summarized for inclusion
/// in a dependent task's context bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyOutput {
    /// The upstream task this output came from.
    pub task_id: Uuid,
    /// Short human-readable title, copied from the task for display.
    pub title: String,
    /// Files the upstream task's worker produced or modified.
    pub files: Vec<ContextFile>,
    /// Free-form summary text from the upstream worker's final report.
    pub summary: String,
}

/// Everything a worker is given when it starts a task: the files it
/// needs from the current sandbox plus summarized output from each
/// approved dependency.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextBundle {
    /// Files gathered from the task's own module area.
    pub files: Vec<ContextFile>,
    /// Outputs from each task in `depends_on`, in dependency order.
    pub dependency_outputs: Vec<DependencyOutput>,
    /// Files that existed but were left out because `max_files` or
    /// `max_file_size` was exceeded, recorded so the omission is
    /// visible rather than silent.
    pub omitted: Vec<PathBuf>,
}

impl ContextBundle {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.dependency_outputs.is_empty()
    }

    /// Total character count across all included file contents and
    /// dependency-output summaries, used for crude budget bookkeeping
    /// before handing the bundle to an agent runner.
    #[must_use]
    pub fn approx_char_count(&self) -> usize {
        let files: usize = self.files.iter().map(|f| f.contents.len()).sum();
        let deps: usize = self
            .dependency_outputs
            .iter()
            .map(|d| d.summary.len() + d.files.iter().map(|f| f.contents.len()).sum::<usize>())
            .sum();
        files + deps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bundle_reports_empty() {
        assert!(ContextBundle::default().is_empty());
    }

    #[test]
    fn char_count_sums_files_and_dependency_outputs() {
        let bundle = ContextBundle {
            files: vec![ContextFile {
                relative_path: "a.rs".into(),
                contents: "abcde".into(),
                truncated: false,
            }],
            dependency_outputs: vec![DependencyOutput {
                task_id: Uuid::new_v4(),
                title: "dep".into(),
                files: vec![],
                summary: "xyz".into(),
            }],
            omitted: vec![],
        };
        assert_eq!(bundle.approx_char_count(), 5 + 3);
    }
}
