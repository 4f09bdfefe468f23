//! Builds the initial task tree from a blueprint's modules (spec §2's
//! "a blueprint produces an initial task tree").
//!
//! Grounded on the teacher's `services/dag_executor.rs` topological
//! bookkeeping: one root task per module, module dependency edges
//! carried over as task `depends_on` edges so the scheduler's existing
//! dependency-gating applies unchanged. Splitting a module's task
//! further is the granularity controller's job, applied afterward.

use std::collections::HashMap;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Blueprint, Task, TaskTree};

/// Seed a [`TaskTree`] with one root task per module in `blueprint`,
/// wiring module dependency ids to task `depends_on` edges.
///
/// # Errors
/// [`DomainError::UnknownModule`] if a module names a dependency id
/// that isn't itself a module in the blueprint. Propagates
/// [`DomainError::DependencyCycle`] if the resulting edges aren't
/// acyclic.
pub fn seed_from_blueprint(blueprint: &Blueprint) -> DomainResult<TaskTree> {
    let mut ids_by_module: HashMap<&str, uuid::Uuid> = HashMap::new();
    let mut tasks = Vec::with_capacity(blueprint.modules.len());

    for module in &blueprint.modules {
        let task = Task::new(
            blueprint.id,
            module.id.clone(),
            module.name.clone(),
            module.description.clone(),
            Vec::new(),
            0,
        );
        ids_by_module.insert(module.id.as_str(), task.id);
        tasks.push(task);
    }

    for (module, task) in blueprint.modules.iter().zip(tasks.iter_mut()) {
        for dep_module_id in &module.dependencies {
            let dep_task_id = ids_by_module
                .get(dep_module_id.as_str())
                .copied()
                .ok_or_else(|| DomainError::UnknownModule(dep_module_id.clone()))?;
            task.depends_on.push(dep_task_id);
        }
        if !task.depends_on.is_empty() {
            task.status = crate::domain::models::TaskStatus::Blocked;
            task.checkpoints[0].status = task.status;
        }
    }

    TaskTree::from_nodes(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::blueprint::{ModuleInterface, ModuleType, SystemModule};

    fn module(id: &str, deps: &[&str]) -> SystemModule {
        SystemModule {
            id: id.to_string(),
            name: id.to_string(),
            description: format!("implement {id}"),
            module_type: ModuleType::Other,
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
            interfaces: Vec::<ModuleInterface>::new(),
        }
    }

    #[test]
    fn seeds_one_task_per_module_with_dependency_edges() {
        let mut bp = Blueprint::new("demo", "a demo system");
        bp.add_module(module("db", &[])).unwrap();
        bp.add_module(module("api", &["db"])).unwrap();

        let tree = seed_from_blueprint(&bp).unwrap();
        assert_eq!(tree.len(), 2);

        let api_task = tree.all().find(|t| t.module_id == "api").unwrap();
        assert_eq!(api_task.depends_on.len(), 1);
        assert_eq!(api_task.status, crate::domain::models::TaskStatus::Blocked);

        let db_task = tree.all().find(|t| t.module_id == "db").unwrap();
        assert_eq!(db_task.status, crate::domain::models::TaskStatus::Pending);
    }

    #[test]
    fn unknown_module_dependency_is_rejected() {
        let mut bp = Blueprint::new("demo", "a demo system");
        bp.add_module(module("api", &["missing"])).unwrap();
        let err = seed_from_blueprint(&bp).unwrap_err();
        assert!(matches!(err, DomainError::UnknownModule(_)));
    }
}
