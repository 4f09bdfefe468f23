//! Independent review verdicts (spec §4.6).
//!
//! Grounded on the teacher's `services/overseers/traits.rs` measurement
//! wrapper (a pass/fail signal plus free-form reasoning), narrowed here
//! to the single required reviewer this system uses instead of an
//! overseer cluster.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The reviewer's structured-output verdict. The reviewer must call a
/// structured-output tool to produce this — there is no text-parsing
/// fallback (spec §4.6); a reviewer run that never calls the tool is a
/// hard error ([`crate::domain::errors::DomainError::ReviewNoVerdict`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewVerdict {
    /// The implementation satisfies its acceptance criteria.
    Passed,
    /// The implementation does not satisfy its acceptance criteria.
    Failed,
    /// Close, but the reviewer wants a specific change before approval.
    NeedsRevision,
}

impl ReviewVerdict {
    /// Normalize a verdict string emitted by an agent that used English
    /// or Chinese synonyms instead of the exact enum tag (e.g. "通过",
    /// "pass", "approved" all mean [`ReviewVerdict::Passed`]).
    #[must_use]
    pub fn normalize(raw: &str) -> Option<Self> {
        let lowered = raw.trim().to_lowercase();
        match lowered.as_str() {
            "passed" | "pass" | "approved" | "通过" | "approve" => Some(Self::Passed),
            "failed" | "fail" | "rejected" | "不通过" | "reject" => Some(Self::Failed),
            "needs_revision" | "needs revision" | "revise" | "需要修改" => {
                Some(Self::NeedsRevision)
            }
            _ => None,
        }
    }
}

/// A single structured finding surfaced by the reviewer: either a
/// confirmation that something was checked, or a concrete problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewItem {
    /// Short description of what was checked or what's wrong.
    pub description: String,
    /// File path the item refers to, if applicable.
    pub file: Option<String>,
}

/// The full record of one review pass over a task, persisted alongside
/// the task for the CLI's `task` inspection view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    /// The verdict.
    pub verdict: ReviewVerdict,
    /// How confident the reviewer is, 0.0-1.0.
    pub confidence: f64,
    /// Free-form explanation of the verdict.
    pub reasoning: String,
    /// Acceptance criteria items the reviewer explicitly verified.
    pub verified_items: Vec<ReviewItem>,
    /// Problems found, if any.
    pub issues: Vec<ReviewItem>,
    /// Suggested follow-ups that do not block approval.
    pub suggestions: Vec<String>,
    /// How long the review took, in milliseconds.
    pub duration_ms: u64,
    /// When the review completed.
    pub reviewed_at: DateTime<Utc>,
}

impl ReviewRecord {
    /// Whether this record authorizes a transition to `Approved`.
    #[must_use]
    pub const fn authorizes_approval(&self) -> bool {
        matches!(self.verdict, ReviewVerdict::Passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_accepts_known_synonyms() {
        assert_eq!(ReviewVerdict::normalize("PASS"), Some(ReviewVerdict::Passed));
        assert_eq!(ReviewVerdict::normalize("通过"), Some(ReviewVerdict::Passed));
        assert_eq!(ReviewVerdict::normalize("reject"), Some(ReviewVerdict::Failed));
        assert_eq!(
            ReviewVerdict::normalize("needs revision"),
            Some(ReviewVerdict::NeedsRevision)
        );
    }

    #[test]
    fn normalize_rejects_unknown_text() {
        assert_eq!(ReviewVerdict::normalize("maybe?"), None);
    }

    #[test]
    fn only_passed_authorizes_approval() {
        let mut record = ReviewRecord {
            verdict: ReviewVerdict::Passed,
            confidence: 0.9,
            reasoning: "looks good".into(),
            verified_items: vec![],
            issues: vec![],
            suggestions: vec![],
            duration_ms: 100,
            reviewed_at: Utc::now(),
        };
        assert!(record.authorizes_approval());
        record.verdict = ReviewVerdict::NeedsRevision;
        assert!(!record.authorizes_approval());
    }
}
