//! Scripted [`AgentRunner`] for tests: returns a fixed sequence of
//! events per call, consumed in order, so integration tests (spec §8's
//! end-to-end scenarios) can drive the scheduler deterministically.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::Stream;

use crate::domain::errors::DomainResult;
use crate::domain::models::AgentEvent;
use crate::domain::ports::agent_runner::{AgentEventStream, AgentRunRequest};
use crate::domain::ports::AgentRunner;

/// A runner that replays one scripted event sequence per call, in
/// the order scripts were registered. If more calls happen than
/// scripts were registered, it replays the last script.
pub struct MockAgentRunner {
    scripts: Mutex<VecDeque<Vec<AgentEvent>>>,
    last: Mutex<Vec<AgentEvent>>,
}

impl MockAgentRunner {
    #[must_use]
    pub fn new(scripts: Vec<Vec<AgentEvent>>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            last: Mutex::new(Vec::new()),
        }
    }

    /// Convenience: a runner that always returns the same script.
    #[must_use]
    pub fn repeating(script: Vec<AgentEvent>) -> Self {
        Self {
            last: Mutex::new(script),
            scripts: Mutex::new(VecDeque::new()),
        }
    }
}

#[async_trait]
impl AgentRunner for MockAgentRunner {
    async fn run(&self, _request: AgentRunRequest) -> DomainResult<AgentEventStream> {
        let events = {
            let mut scripts = self.scripts.lock().unwrap();
            if let Some(next) = scripts.pop_front() {
                let mut last = self.last.lock().unwrap();
                *last = next.clone();
                next
            } else {
                self.last.lock().unwrap().clone()
            }
        };
        Ok(Box::pin(futures::stream::iter(events)) as Pin<Box<dyn Stream<Item = AgentEvent> + Send>>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn replays_scripts_in_order_then_repeats_last() {
        let runner = MockAgentRunner::new(vec![
            vec![AgentEvent::TextChunk("first".into())],
            vec![AgentEvent::TextChunk("second".into())],
        ]);

        let request = AgentRunRequest {
            system_prompt: String::new(),
            initial_prompt: String::new(),
            workdir: std::path::PathBuf::from("/tmp"),
            allowed_tools: vec![],
            max_turns: 1,
            thinking_enabled: false,
        };

        let first: Vec<_> = runner.run(request.clone()).await.unwrap().collect().await;
        assert_eq!(first, vec![AgentEvent::TextChunk("first".into())]);

        let second: Vec<_> = runner.run(request.clone()).await.unwrap().collect().await;
        assert_eq!(second, vec![AgentEvent::TextChunk("second".into())]);

        let third: Vec<_> = runner.run(request).await.unwrap().collect().await;
        assert_eq!(third, vec![AgentEvent::TextChunk("second".into())]);
    }
}
