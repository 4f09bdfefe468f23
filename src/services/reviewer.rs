//! Reviewer: an independent agent that judges a completed task against
//! its acceptance criteria (spec §4.6).
//!
//! Grounded on the teacher's `services/overseers/traits.rs` (a
//! pass/fail measurement wrapper) and `services/overseers/acceptance_test.rs`
//! (verifying against a stated acceptance criterion), narrowed from an
//! overseer cluster down to the single required judge this system uses.
//! The judge must call the `submit_verdict` structured-output tool; a
//! run that never calls it is a hard error, never parsed from free text.

use std::path::Path;
use std::sync::Arc;

use futures::StreamExt;
use tracing::instrument;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::config::ReviewStrictness;
use crate::domain::models::{AgentEvent, ReviewRecord, ReviewVerdict};
use crate::domain::ports::{AgentRunRequest, AgentRunner};

/// The tool name the reviewer must call to emit its verdict.
pub const VERDICT_TOOL_NAME: &str = "submit_verdict";

#[derive(Debug, serde::Deserialize)]
struct RawVerdict {
    verdict: String,
    confidence: f64,
    reasoning: String,
    #[serde(default)]
    verified_items: Vec<RawReviewItem>,
    #[serde(default)]
    issues: Vec<RawReviewItem>,
    #[serde(default)]
    suggestions: Vec<String>,
}

#[derive(Debug, serde::Deserialize)]
struct RawReviewItem {
    description: String,
    #[serde(default)]
    file: Option<String>,
}

/// Runs the independent reviewer agent for one task.
pub struct Reviewer {
    runner: Arc<dyn AgentRunner>,
    strictness: ReviewStrictness,
    max_turns: u32,
}

impl Reviewer {
    #[must_use]
    pub fn new(runner: Arc<dyn AgentRunner>, strictness: ReviewStrictness, max_turns: u32) -> Self {
        Self {
            runner,
            strictness,
            max_turns,
        }
    }

    fn system_prompt(&self) -> String {
        format!(
            "You are an independent reviewer. You did not write this code. Verify the \
             implementation against its acceptance criteria and call the `{VERDICT_TOOL_NAME}` \
             tool exactly once with your verdict. {}",
            self.strictness.instruction()
        )
    }

    /// Review `task_id`'s implementation in `workdir` against
    /// `acceptance_tests`.
    ///
    /// # Errors
    /// [`DomainError::ReviewNoVerdict`] if the agent never calls the
    /// verdict tool; [`DomainError::SerializationError`] if it calls the
    /// tool with a body that doesn't match the expected verdict shape.
    #[instrument(skip(self, acceptance_tests), fields(task_id = %task_id))]
    pub async fn review(
        &self,
        task_id: Uuid,
        title: &str,
        acceptance_tests: &[String],
        workdir: &Path,
    ) -> DomainResult<ReviewRecord> {
        let started = std::time::Instant::now();
        let criteria = acceptance_tests
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{}. {c}", i + 1))
            .collect::<Vec<_>>()
            .join("\n");

        let request = AgentRunRequest {
            system_prompt: self.system_prompt(),
            initial_prompt: format!(
                "# Review: {title}\n\nAcceptance criteria:\n{criteria}\n\n\
                 Inspect the implementation in this sandbox and call `{VERDICT_TOOL_NAME}`."
            ),
            workdir: workdir.to_path_buf(),
            allowed_tools: vec![VERDICT_TOOL_NAME.to_string()],
            max_turns: self.max_turns,
            thinking_enabled: true,
        };

        let mut stream = self.runner.run(request).await?;
        let mut verdict: Option<RawVerdict> = None;

        while let Some(event) = stream.next().await {
            if let AgentEvent::ToolEnd {
                name,
                success,
                output_excerpt,
                ..
            } = event
            {
                if name == VERDICT_TOOL_NAME && success {
                    verdict = Some(serde_json::from_str(&output_excerpt)?);
                }
            }
        }

        let raw = verdict.ok_or(DomainError::ReviewNoVerdict(task_id))?;
        let parsed_verdict = ReviewVerdict::normalize(&raw.verdict).ok_or_else(|| {
            DomainError::SerializationError(format!("unrecognized verdict string: {}", raw.verdict))
        })?;

        Ok(ReviewRecord {
            verdict: parsed_verdict,
            confidence: raw.confidence,
            reasoning: raw.reasoning,
            verified_items: raw
                .verified_items
                .into_iter()
                .map(|i| crate::domain::models::ReviewItem {
                    description: i.description,
                    file: i.file,
                })
                .collect(),
            issues: raw
                .issues
                .into_iter()
                .map(|i| crate::domain::models::ReviewItem {
                    description: i.description,
                    file: i.file,
                })
                .collect(),
            suggestions: raw.suggestions,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            reviewed_at: chrono::Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::pin::Pin;

    struct ScriptedRunner {
        events: std::sync::Mutex<Vec<AgentEvent>>,
    }

    #[async_trait]
    impl AgentRunner for ScriptedRunner {
        async fn run(
            &self,
            _request: AgentRunRequest,
        ) -> DomainResult<Pin<Box<dyn futures::Stream<Item = AgentEvent> + Send>>> {
            let events = std::mem::take(&mut *self.events.lock().unwrap());
            Ok(Box::pin(futures::stream::iter(events)))
        }
    }

    #[tokio::test]
    async fn review_parses_verdict_tool_call() {
        let body = serde_json::json!({
            "verdict": "passed",
            "confidence": 0.95,
            "reasoning": "all criteria met",
            "verified_items": [{"description": "test passes", "file": null}],
            "issues": [],
            "suggestions": []
        })
        .to_string();
        let runner = Arc::new(ScriptedRunner {
            events: std::sync::Mutex::new(vec![AgentEvent::ToolEnd {
                name: VERDICT_TOOL_NAME.into(),
                success: true,
                output_excerpt: body,
                persisted_output_path: None,
            }]),
        });
        let reviewer = Reviewer::new(runner, ReviewStrictness::Normal, 10);
        let record = reviewer
            .review(Uuid::new_v4(), "task", &["does the thing".into()], Path::new("/tmp"))
            .await
            .unwrap();
        assert_eq!(record.verdict, ReviewVerdict::Passed);
        assert!(record.authorizes_approval());
    }

    #[tokio::test]
    async fn review_errors_when_no_verdict_tool_called() {
        let runner = Arc::new(ScriptedRunner {
            events: std::sync::Mutex::new(vec![AgentEvent::TextChunk("looks fine".into())]),
        });
        let reviewer = Reviewer::new(runner, ReviewStrictness::Normal, 10);
        let err = reviewer
            .review(Uuid::new_v4(), "task", &[], Path::new("/tmp"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ReviewNoVerdict(_)));
    }
}
