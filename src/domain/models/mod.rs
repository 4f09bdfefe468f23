//! Domain model types: pure data and the invariants that govern them.

pub mod agent_event;
pub mod blueprint;
pub mod config;
pub mod context;
pub mod lock;
pub mod review;
pub mod sandbox;
pub mod task;
pub mod task_tree;

pub use agent_event::{AgentEvent, EventAccumulator, ToolCallRecord, WorkerExecutionSummary};
pub use blueprint::{Blueprint, ModuleInterface, ModuleType, SystemModule};
pub use config::Config;
pub use context::{ContextBundle, ContextFile, DependencyOutput};
pub use lock::{LockDenialReason, LockHandle, LockRecord};
pub use review::{ReviewItem, ReviewRecord, ReviewVerdict};
pub use sandbox::{FileFingerprint, Sandbox, SyncBackConflict, SyncBackResult};
pub use task::{Checkpoint, Task, TaskSource, TaskStatus};
pub use task_tree::TaskTree;
