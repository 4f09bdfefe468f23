//! Blueprint: the top-level description of the system being built.
//!
//! Grounded on the teacher's `domain/models/goal.rs` (a top-level record
//! with a status enum and a free-form requirements field), generalized
//! to the module/interface shape spec §2 requires.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A named seam between two modules: what one exposes for the other to
/// call, expressed as free text (function signatures, REST routes,
/// message schemas — whatever the blueprint author wrote).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInterface {
    /// The module id on the other side of this interface.
    pub with_module: String,
    /// Free-form description of what crosses the seam.
    pub description: String,
}

/// What kind of subsystem a module is, used by the granularity
/// controller's line-estimation module-type factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleType {
    Frontend,
    Backend,
    Database,
    Service,
    Infrastructure,
    Other,
}

impl Default for ModuleType {
    fn default() -> Self {
        Self::Other
    }
}

/// One subsystem of the target system, as laid out by the blueprint
/// before any task exists for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemModule {
    /// Stable identifier referenced by `Task::module_id`.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// What this module is responsible for.
    pub description: String,
    /// What kind of subsystem this is.
    #[serde(default)]
    pub module_type: ModuleType,
    /// Ids of other modules this one depends on.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Interfaces this module shares with other modules.
    #[serde(default)]
    pub interfaces: Vec<ModuleInterface>,
}

/// The root artifact an orchestration run is seeded from: a description
/// of the system to build, decomposed into modules (spec §2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    /// Unique id.
    pub id: Uuid,
    /// Short name of the overall system.
    pub name: String,
    /// High-level goal description supplied by the operator.
    pub description: String,
    /// Modules identified during decomposition.
    pub modules: Vec<SystemModule>,
    /// When this blueprint was created.
    pub created_at: DateTime<Utc>,
}

impl Blueprint {
    /// Construct a new blueprint with no modules yet.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            modules: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Look up a module by id.
    pub fn module(&self, id: &str) -> Option<&SystemModule> {
        self.modules.iter().find(|m| m.id == id)
    }

    /// All module ids, for validating task/module references.
    pub fn module_ids(&self) -> HashMap<&str, &SystemModule> {
        self.modules.iter().map(|m| (m.id.as_str(), m)).collect()
    }

    /// Append a module, returning an error message if the id already
    /// exists (caller decides whether that's fatal).
    pub fn add_module(&mut self, module: SystemModule) -> Result<(), String> {
        if self.modules.iter().any(|m| m.id == module.id) {
            return Err(format!("module id already exists: {}", module.id));
        }
        self.modules.push(module);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_module_rejects_duplicate_id() {
        let mut bp = Blueprint::new("demo", "a demo system");
        bp.add_module(SystemModule {
            id: "core".into(),
            name: "Core".into(),
            description: "core logic".into(),
            module_type: ModuleType::Other,
            dependencies: vec![],
            interfaces: vec![],
        })
        .unwrap();

        let err = bp
            .add_module(SystemModule {
                id: "core".into(),
                name: "Core 2".into(),
                description: "dup".into(),
                module_type: ModuleType::Other,
                dependencies: vec![],
                interfaces: vec![],
            })
            .unwrap_err();
        assert!(err.contains("core"));
    }

    #[test]
    fn module_lookup_finds_by_id() {
        let mut bp = Blueprint::new("demo", "a demo system");
        bp.add_module(SystemModule {
            id: "core".into(),
            name: "Core".into(),
            description: "core logic".into(),
            module_type: ModuleType::Other,
            dependencies: vec![],
            interfaces: vec![],
        })
        .unwrap();
        assert!(bp.module("core").is_some());
        assert!(bp.module("missing").is_none());
    }
}
