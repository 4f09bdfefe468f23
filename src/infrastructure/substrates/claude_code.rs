//! Real [`AgentRunner`] adapter: shells out to the `claude` CLI and
//! parses its streamed JSON-lines output into [`AgentEvent`]s.
//!
//! Grounded on the teacher's `infrastructure/substrates/claude_code.rs`:
//! spawn the CLI with `--output-format stream-json`, read stdout
//! line-by-line, and translate each line into a domain event rather
//! than exposing the raw process to callers.

use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;

use async_trait::async_trait;
use futures::Stream;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::warn;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::AgentEvent;
use crate::domain::ports::agent_runner::{AgentEventStream, AgentRunRequest};
use crate::domain::ports::AgentRunner;

/// Path to the `claude` binary, overridable for tests against a fake.
#[derive(Debug, Clone)]
pub struct ClaudeCodeAgentRunner {
    binary: PathBuf,
}

impl ClaudeCodeAgentRunner {
    #[must_use]
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }
}

impl Default for ClaudeCodeAgentRunner {
    fn default() -> Self {
        Self::new(PathBuf::from("claude"))
    }
}

/// One line of the CLI's `stream-json` output.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamLine {
    Text { text: String },
    ToolUse { name: String, input: serde_json::Value },
    ToolResult { name: String, is_error: bool, content: String },
    Result { is_error: bool, #[serde(default)] error: Option<String> },
}

fn parse_line(line: &str) -> Option<AgentEvent> {
    let parsed: StreamLine = serde_json::from_str(line).ok()?;
    Some(match parsed {
        StreamLine::Text { text } => AgentEvent::TextChunk(text),
        StreamLine::ToolUse { name, input } => AgentEvent::ToolStart {
            name,
            input: input.to_string(),
        },
        StreamLine::ToolResult { name, is_error, content } => AgentEvent::ToolEnd {
            name,
            success: !is_error,
            output_excerpt: content,
            persisted_output_path: None,
        },
        StreamLine::Result { is_error, error } => {
            if is_error {
                AgentEvent::Error(error.unwrap_or_else(|| "agent run failed".to_string()))
            } else {
                AgentEvent::Done
            }
        }
    })
}

#[async_trait]
impl AgentRunner for ClaudeCodeAgentRunner {
    async fn run(&self, request: AgentRunRequest) -> DomainResult<AgentEventStream> {
        let mut command = Command::new(&self.binary);
        command
            .arg("--print")
            .arg("--output-format")
            .arg("stream-json")
            .arg("--system-prompt")
            .arg(&request.system_prompt)
            .arg("--max-turns")
            .arg(request.max_turns.to_string())
            .arg("--allowed-tools")
            .arg(request.allowed_tools.join(","))
            .arg(&request.initial_prompt)
            .current_dir(&request.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if request.thinking_enabled {
            command.arg("--thinking");
        }

        let mut child = command
            .spawn()
            .map_err(|e| DomainError::Io(format!("failed to spawn claude CLI: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DomainError::Io("claude CLI stdout not captured".to_string()))?;

        let (tx, rx) = mpsc::channel::<AgentEvent>(64);

        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if let Some(event) = parse_line(&line) {
                            if tx.send(event).await.is_err() {
                                break;
                            }
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(error = %e, "error reading claude CLI stdout");
                        break;
                    }
                }
            }
            let _ = child.wait().await;
        });

        let stream = tokio_stream::wrappers::ReceiverStream::new(rx);
        Ok(Box::pin(stream) as Pin<Box<dyn Stream<Item = AgentEvent> + Send>>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_chunk() {
        let line = r#"{"type": "text", "text": "hello"}"#;
        assert_eq!(parse_line(line), Some(AgentEvent::TextChunk("hello".into())));
    }

    #[test]
    fn parses_tool_use_and_result() {
        let start = r#"{"type": "tool_use", "name": "bash", "input": {"command": "ls"}}"#;
        match parse_line(start).unwrap() {
            AgentEvent::ToolStart { name, .. } => assert_eq!(name, "bash"),
            other => panic!("unexpected event: {other:?}"),
        }

        let end = r#"{"type": "tool_result", "name": "bash", "is_error": false, "content": "ok"}"#;
        match parse_line(end).unwrap() {
            AgentEvent::ToolEnd { success, .. } => assert!(success),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn parses_error_result() {
        let line = r#"{"type": "result", "is_error": true, "error": "boom"}"#;
        assert_eq!(parse_line(line), Some(AgentEvent::Error("boom".into())));
    }

    #[test]
    fn unparseable_line_yields_none() {
        assert!(parse_line("not json").is_none());
    }
}
