//! The agent event stream and worker execution summaries (spec §4.5).
//!
//! Grounded on the teacher's `infrastructure/claude/streaming.rs` SSE
//! event parser (`TextChunk`/`ToolStart`/`ToolEnd`/`Error`/`Done`
//! shape), carried over as the [`AgentEvent`] enum the `AgentRunner`
//! port's stream yields, and `application/agent_executor.rs`'s
//! tool-call bookkeeping, carried over as [`ToolCallRecord`].

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One event emitted while an agent runs against a sandbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AgentEvent {
    /// A chunk of the agent's running commentary/reasoning text.
    TextChunk(String),
    /// The agent started invoking a tool.
    ToolStart {
        /// Tool name (e.g. "bash", "edit", "structured_output").
        name: String,
        /// JSON-encoded input to the tool, kept opaque at this layer.
        input: String,
    },
    /// A previously started tool call finished.
    ToolEnd {
        /// Tool name, matching the corresponding `ToolStart`.
        name: String,
        /// Whether the tool call succeeded.
        success: bool,
        /// Output, possibly a pointer to a persisted file if large
        /// (spec §4.5: outputs over 8 KiB are persisted to
        /// `.abathur/outputs/` with only a head/tail excerpt kept here).
        output_excerpt: String,
        /// Set when `output_excerpt` was truncated and the full output
        /// was persisted to disk.
        persisted_output_path: Option<PathBuf>,
    },
    /// The agent run failed.
    Error(String),
    /// The agent run completed normally.
    Done,
}

/// A flattened record of one tool call, built up as `ToolStart`/`ToolEnd`
/// events are consumed, for inclusion in a [`WorkerExecutionSummary`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub name: String,
    pub input: String,
    pub success: bool,
    pub output_excerpt: String,
    pub persisted_output_path: Option<PathBuf>,
}

/// What a worker reports back to the scheduler once its agent run
/// finishes: not the raw event stream, but a digest of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerExecutionSummary {
    /// Concatenated text commentary from the run.
    pub narrative: String,
    /// Every tool call made during the run, in order.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Whether the run ended in `AgentEvent::Done` rather than `Error`.
    pub succeeded: bool,
    /// Error text if the run did not succeed.
    pub error: Option<String>,
    /// Wall-clock duration of the run.
    pub duration_ms: u64,
    /// Number of agent turns consumed.
    pub turns_used: u32,
    pub finished_at: DateTime<Utc>,
}

/// Accumulates [`AgentEvent`]s into a [`WorkerExecutionSummary`]. Mirrors
/// the teacher's `agent_executor.rs` consumption loop, which folds a
/// stream into a single report rather than keeping every event around.
#[derive(Debug, Default)]
pub struct EventAccumulator {
    narrative: String,
    tool_calls: Vec<ToolCallRecord>,
    pending_tool: Option<(String, String)>,
    turns_used: u32,
    error: Option<String>,
}

impl EventAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the accumulator.
    pub fn push(&mut self, event: AgentEvent) {
        match event {
            AgentEvent::TextChunk(text) => {
                self.narrative.push_str(&text);
                self.turns_used += 1;
            }
            AgentEvent::ToolStart { name, input } => {
                self.pending_tool = Some((name, input));
            }
            AgentEvent::ToolEnd {
                name,
                success,
                output_excerpt,
                persisted_output_path,
            } => {
                let input = self
                    .pending_tool
                    .take()
                    .filter(|(pending_name, _)| *pending_name == name)
                    .map_or_else(String::new, |(_, input)| input);
                self.tool_calls.push(ToolCallRecord {
                    name,
                    input,
                    success,
                    output_excerpt,
                    persisted_output_path,
                });
            }
            AgentEvent::Error(err) => {
                self.error = Some(err);
            }
            AgentEvent::Done => {}
        }
    }

    /// Finalize into a summary. `duration_ms` is supplied by the caller,
    /// which is the only thing that knows the run's wall-clock span.
    #[must_use]
    pub fn finish(self, duration_ms: u64) -> WorkerExecutionSummary {
        let succeeded = self.error.is_none();
        WorkerExecutionSummary {
            narrative: self.narrative,
            tool_calls: self.tool_calls,
            succeeded,
            error: self.error,
            duration_ms,
            turns_used: self.turns_used,
            finished_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulator_pairs_tool_start_and_end() {
        let mut acc = EventAccumulator::new();
        acc.push(AgentEvent::ToolStart {
            name: "bash".into(),
            input: "ls".into(),
        });
        acc.push(AgentEvent::ToolEnd {
            name: "bash".into(),
            success: true,
            output_excerpt: "file.txt".into(),
            persisted_output_path: None,
        });
        let summary = acc.finish(10);
        assert_eq!(summary.tool_calls.len(), 1);
        assert_eq!(summary.tool_calls[0].input, "ls");
        assert!(summary.succeeded);
    }

    #[test]
    fn accumulator_marks_failure_on_error_event() {
        let mut acc = EventAccumulator::new();
        acc.push(AgentEvent::TextChunk("working...".into()));
        acc.push(AgentEvent::Error("agent crashed".into()));
        let summary = acc.finish(5);
        assert!(!summary.succeeded);
        assert_eq!(summary.error.as_deref(), Some("agent crashed"));
    }
}
