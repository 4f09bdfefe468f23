//! Worker: runs one task through test-writing, coding, and testing by
//! driving an [`AgentRunner`] against a sandbox (spec §4.5).
//!
//! Grounded on the teacher's `application/agent_executor.rs`: a loop
//! that consumes an event stream and folds it into a single execution
//! report, recording large tool outputs to disk rather than keeping
//! them in memory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{AgentEvent, ContextBundle, EventAccumulator, WorkerExecutionSummary};
use crate::domain::ports::{AgentRunRequest, AgentRunner};

/// Tool outputs larger than this are persisted to disk and replaced in
/// the in-memory event with a head/tail excerpt plus a pointer, so a
/// single chatty tool call cannot blow up memory for a long-running
/// task (spec §4.5).
pub const PERSIST_OUTPUT_THRESHOLD_BYTES: usize = 8 * 1024;

const EXCERPT_HEAD_BYTES: usize = 2 * 1024;
const EXCERPT_TAIL_BYTES: usize = 1 * 1024;

/// Runs a single worker agent session.
pub struct Worker {
    runner: Arc<dyn AgentRunner>,
    output_dir: PathBuf,
}

impl Worker {
    #[must_use]
    pub fn new(runner: Arc<dyn AgentRunner>, output_dir: PathBuf) -> Self {
        Self { runner, output_dir }
    }

    /// Build the worker's system prompt. Kept separate from `execute`
    /// so it can be golden-tested independent of any agent runner.
    #[must_use]
    pub fn system_prompt() -> String {
        "You are a worker agent in an autonomous software engineering pipeline. \
         You will write a failing acceptance test, then implement the task until \
         the test passes. Work only within the sandbox directory you are given. \
         Stop once the acceptance test passes."
            .to_string()
    }

    /// Build the initial prompt for `task_id` from its description and
    /// assembled context.
    #[must_use]
    pub fn initial_prompt(title: &str, description: &str, context: &ContextBundle) -> String {
        let mut prompt = format!("# Task: {title}\n\n{description}\n");
        if !context.dependency_outputs.is_empty() {
            prompt.push_str("\n## Outputs from completed dependencies\n");
            for dep in &context.dependency_outputs {
                prompt.push_str(&format!("\n### {}\n{}\n", dep.title, dep.summary));
            }
        }
        if !context.files.is_empty() {
            prompt.push_str("\n## Relevant existing files\n");
            for file in &context.files {
                prompt.push_str(&format!(
                    "\n--- {} ---\n{}\n",
                    file.relative_path.display(),
                    file.contents
                ));
            }
        }
        prompt
    }

    /// Run the agent against `workdir`, folding its event stream into a
    /// [`WorkerExecutionSummary`]. Large tool outputs are persisted to
    /// `self.output_dir` and replaced with an excerpt.
    ///
    /// # Errors
    /// [`DomainError::Io`] if persisting a large tool output fails; the
    /// agent-runner port's own errors propagate unchanged.
    #[instrument(skip(self, context), fields(task_id = %task_id))]
    pub async fn execute(
        &self,
        task_id: Uuid,
        title: &str,
        description: &str,
        workdir: &Path,
        context: ContextBundle,
        allowed_tools: Vec<String>,
        max_turns: u32,
    ) -> DomainResult<WorkerExecutionSummary> {
        let started = std::time::Instant::now();
        let request = AgentRunRequest {
            system_prompt: Self::system_prompt(),
            initial_prompt: Self::initial_prompt(title, description, &context),
            workdir: workdir.to_path_buf(),
            allowed_tools,
            max_turns,
            thinking_enabled: false,
        };

        let mut stream = self.runner.run(request).await?;
        let mut accumulator = EventAccumulator::new();

        while let Some(event) = stream.next().await {
            let event = self.maybe_persist_large_output(task_id, event).await?;
            accumulator.push(event);
        }

        let summary = accumulator.finish(
            u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        );
        info!(succeeded = summary.succeeded, turns = summary.turns_used, "worker run finished");
        Ok(summary)
    }

    async fn maybe_persist_large_output(
        &self,
        task_id: Uuid,
        event: AgentEvent,
    ) -> DomainResult<AgentEvent> {
        let AgentEvent::ToolEnd {
            name,
            success,
            output_excerpt,
            persisted_output_path,
        } = event
        else {
            return Ok(event);
        };

        if output_excerpt.len() <= PERSIST_OUTPUT_THRESHOLD_BYTES || persisted_output_path.is_some()
        {
            return Ok(AgentEvent::ToolEnd {
                name,
                success,
                output_excerpt,
                persisted_output_path,
            });
        }

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let suffix: u32 = rand::random();
        let file_name = format!("{task_id}-{name}-{suffix:08x}.log");
        let path = self.output_dir.join(file_name);
        tokio::fs::write(&path, &output_excerpt).await?;

        let head = &output_excerpt[..output_excerpt.len().min(EXCERPT_HEAD_BYTES)];
        let tail_start = output_excerpt.len().saturating_sub(EXCERPT_TAIL_BYTES);
        let tail = &output_excerpt[tail_start..];
        let excerpt = format!("{head}\n... [truncated, full output persisted] ...\n{tail}");

        Ok(AgentEvent::ToolEnd {
            name,
            success,
            output_excerpt: excerpt,
            persisted_output_path: Some(path),
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
    async fn execute_folds_stream_into_summary() {
        let runner = Arc::new(ScriptedRunner {
            events: std::sync::Mutex::new(vec![
                AgentEvent::TextChunk("working".into()),
                AgentEvent::ToolStart {
                    name: "bash".into(),
                    input: "cargo test".into(),
                },
                AgentEvent::ToolEnd {
                    name: "bash".into(),
                    success: true,
                    output_excerpt: "test result: ok".into(),
                    persisted_output_path: None,
                },
                AgentEvent::Done,
            ]),
        });
        let output_dir = tempfile::tempdir().unwrap();
        let worker = Worker::new(runner, output_dir.path().to_path_buf());

        let summary = worker
            .execute(
                Uuid::new_v4(),
                "title",
                "description",
                Path::new("/tmp"),
                ContextBundle::default(),
                vec!["bash".into()],
                10,
            )
            .await
            .unwrap();

        assert!(summary.succeeded);
        assert_eq!(summary.tool_calls.len(), 1);
    }

    #[tokio::test]
    async fn large_output_is_persisted_and_excerpted() {
        let runner = Arc::new(ScriptedRunner {
            events: std::sync::Mutex::new(vec![
                AgentEvent::ToolStart {
                    name: "bash".into(),
                    input: "dump".into(),
                },
                AgentEvent::ToolEnd {
                    name: "bash".into(),
                    success: true,
                    output_excerpt: "x".repeat(PERSIST_OUTPUT_THRESHOLD_BYTES + 100),
                    persisted_output_path: None,
                },
            ]),
        });
        let output_dir = tempfile::tempdir().unwrap();
        let worker = Worker::new(runner, output_dir.path().to_path_buf());

        let summary = worker
            .execute(
                Uuid::new_v4(),
                "title",
                "description",
                Path::new("/tmp"),
                ContextBundle::default(),
                vec![],
                10,
            )
            .await
            .unwrap();

        let call = &summary.tool_calls[0];
        assert!(call.persisted_output_path.is_some());
        assert!(call.output_excerpt.len() < PERSIST_OUTPUT_THRESHOLD_BYTES + 100);
    }
}
