//! `SQLite` persistence for tasks and blueprints.

pub mod blueprint_repo;
pub mod connection;
pub mod task_repo;

pub use blueprint_repo::SqliteBlueprintRepository;
pub use connection::connect;
pub use task_repo::SqliteTaskRepository;
