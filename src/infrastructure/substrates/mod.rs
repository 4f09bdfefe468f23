//! Agent runner adapters: concrete implementations of the
//! [`crate::domain::ports::AgentRunner`] port.

pub mod claude_code;
pub mod mock;
pub mod registry;

pub use claude_code::ClaudeCodeAgentRunner;
pub use mock::MockAgentRunner;
pub use registry::{build, SubstrateKind};
