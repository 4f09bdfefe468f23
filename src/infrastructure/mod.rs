//! Infrastructure layer
//!
//! Concrete adapters for the ports the domain and service layers
//! depend on: `SQLite` persistence, the agent-runner substrates,
//! layered configuration, structured logging, and project setup.

pub mod config;
pub mod database;
pub mod git;
pub mod logging;
pub mod setup;
pub mod substrates;

pub use git::ShellGitCapability;
