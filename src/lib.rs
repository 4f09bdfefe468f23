//! Autonomous multi-agent software-engineering task orchestration
//! engine: blueprint -> task tree -> granularity-controlled adjustment
//! -> dependency-gated scheduling -> per-task worker/reviewer loop with
//! context assembly, sandboxed execution, and conflict-aware sync-back.

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;
