//! Services: the orchestration engine's application logic, built on top
//! of the domain models and ports.

pub mod context_collector;
pub mod granularity_controller;
pub mod lock_manager;
pub mod reviewer;
pub mod sandbox;
pub mod scheduler;
pub mod seeding;
pub mod worker;

pub use context_collector::ContextCollector;
pub use granularity_controller::{
    AdjustmentResult, ComplexityScore, GranularityController, GranularityDecision,
    GranularityReport, IssueSeverity, MergeSuggestion, SplitStrategy, SplitSuggestion, TreeIssue,
    TreeIssueKind,
};
pub use lock_manager::LockManager;
pub use reviewer::Reviewer;
pub use sandbox::SandboxManager;
pub use scheduler::{ControlSignal, Scheduler, SchedulerOptions};
pub use seeding::seed_from_blueprint;
pub use worker::Worker;
