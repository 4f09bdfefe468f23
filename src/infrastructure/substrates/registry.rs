//! Selects the concrete [`AgentRunner`] backend for a run, mirroring the
//! teacher's substrate-registry pattern of keeping backend choice
//! behind one name instead of scattering `if cfg!`/env checks.

use std::path::PathBuf;
use std::sync::Arc;

use crate::domain::ports::AgentRunner;
use crate::infrastructure::substrates::claude_code::ClaudeCodeAgentRunner;

/// Which agent backend to use for a run.
#[derive(Debug, Clone)]
pub enum SubstrateKind {
    /// Shell out to the real `claude` CLI.
    ClaudeCode { binary: PathBuf },
}

/// Construct the [`AgentRunner`] for a [`SubstrateKind`].
#[must_use]
pub fn build(kind: &SubstrateKind) -> Arc<dyn AgentRunner> {
    match kind {
        SubstrateKind::ClaudeCode { binary } => Arc::new(ClaudeCodeAgentRunner::new(binary.clone())),
    }
}

impl Default for SubstrateKind {
    fn default() -> Self {
        Self::ClaudeCode {
            binary: PathBuf::from("claude"),
        }
    }
}
