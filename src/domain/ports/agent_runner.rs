//! Port for running an agent against a sandbox (spec §4.5).
//!
//! Grounded on the teacher's `infrastructure/substrates/claude_code.rs`
//! (shells out to the `claude` CLI, streams parsed stdout lines back to
//! the caller) and `infrastructure/substrates/registry.rs` (swappable
//! backend behind one trait). Two adapters implement this port:
//! `infrastructure::substrates::claude_code::ClaudeCodeAgentRunner` for
//! real runs and `infrastructure::substrates::mock::MockAgentRunner` for
//! tests.

use std::path::PathBuf;
use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::domain::errors::DomainResult;
use crate::domain::models::AgentEvent;

/// A live stream of [`AgentEvent`]s from one agent run.
pub type AgentEventStream = Pin<Box<dyn Stream<Item = AgentEvent> + Send>>;

/// Parameters for one agent invocation.
#[derive(Debug, Clone)]
pub struct AgentRunRequest {
    /// System prompt establishing the agent's role (worker or reviewer).
    pub system_prompt: String,
    /// The task-specific initial prompt, including its context bundle.
    pub initial_prompt: String,
    /// Sandbox directory the agent should operate in.
    pub workdir: PathBuf,
    /// Tool names the agent is permitted to call.
    pub allowed_tools: Vec<String>,
    /// Maximum number of agent turns before the run is cut off.
    pub max_turns: u32,
    /// Whether extended thinking/reasoning mode is requested.
    pub thinking_enabled: bool,
}

/// Runs an agent against a sandbox and streams back its events.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    /// Start a run, returning a stream of events as they arrive. The
    /// stream ends with [`AgentEvent::Done`] or [`AgentEvent::Error`].
    async fn run(&self, request: AgentRunRequest) -> DomainResult<AgentEventStream>;
}
