//! Ports: trait boundaries the domain and service layers depend on,
//! implemented concretely in `infrastructure`.

pub mod agent_runner;
pub mod blueprint_repository;
pub mod git;
pub mod task_repository;

pub use agent_runner::{AgentEventStream, AgentRunRequest, AgentRunner};
pub use blueprint_repository::BlueprintRepository;
pub use git::GitCapability;
pub use task_repository::TaskRepository;
