//! The task tree: parent/child forest plus a separate dependency graph
//! over the same nodes (spec §3).
//!
//! Grounded on the teacher's `domain/models/dag.rs` — DFS-based cycle
//! detection and topological ordering — generalized from a single flat
//! dependency graph to a parent-pointer tree (`parent_id`) with an
//! independent `depends_on` edge set layered on top.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::task::{Task, TaskStatus};

/// Owns every [`Task`] in a run and exposes tree/graph operations over
/// them.
///
/// Invariants (checked by [`TaskTree::validate_dependencies`] and
/// [`TaskTree::insert`]):
/// (a) every `parent_id` refers to a node present in the tree;
/// (b) the `depends_on` edge set is acyclic;
/// (c) a task's `depth` equals its parent's depth + 1 (0 for roots);
/// (d) a task reaches `Approved` only once every id in its `depends_on`
///     set is itself `Approved` (enforced by the scheduler, not here —
///     the tree only stores state, it does not gate transitions).
#[derive(Debug, Clone, Default)]
pub struct TaskTree {
    nodes: HashMap<Uuid, Task>,
}

impl TaskTree {
    /// An empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    /// Build a tree from a flat list of tasks, validating invariants
    /// (a), (b), and (c) before returning.
    ///
    /// # Errors
    /// Returns [`DomainError::OrphanedTask`] or [`DomainError::DependencyCycle`].
    pub fn from_nodes(tasks: Vec<Task>) -> DomainResult<Self> {
        let mut tree = Self::new();
        for task in tasks {
            tree.nodes.insert(task.id, task);
        }
        tree.validate_parents()?;
        tree.validate_dependencies()?;
        Ok(tree)
    }

    /// Insert or replace a task, re-validating invariants over the
    /// whole tree. Cheap enough for the tree sizes this engine targets
    /// (bounded by `max_depth` / `max_children_per_node`).
    ///
    /// # Errors
    /// See [`TaskTree::from_nodes`].
    pub fn insert(&mut self, task: Task) -> DomainResult<()> {
        let id = task.id;
        let previous = self.nodes.insert(id, task);
        if let Err(e) = self.validate_parents().and_then(|()| self.validate_dependencies()) {
            // Roll back so a rejected insert leaves the tree unchanged.
            match previous {
                Some(prev) => {
                    self.nodes.insert(id, prev);
                }
                None => {
                    self.nodes.remove(&id);
                }
            }
            return Err(e);
        }
        Ok(())
    }

    fn validate_parents(&self) -> DomainResult<()> {
        for task in self.nodes.values() {
            if let Some(parent_id) = task.parent_id {
                if !self.nodes.contains_key(&parent_id) {
                    return Err(DomainError::OrphanedTask(task.id));
                }
            }
        }
        Ok(())
    }

    /// DFS-based cycle detection over the `depends_on` edge set.
    fn validate_dependencies(&self) -> DomainResult<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }
        let mut marks: HashMap<Uuid, Mark> = HashMap::new();

        fn visit(
            id: Uuid,
            nodes: &HashMap<Uuid, Task>,
            marks: &mut HashMap<Uuid, Mark>,
        ) -> DomainResult<()> {
            match marks.get(&id) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::Visiting) => return Err(DomainError::DependencyCycle(id)),
                None => {}
            }
            marks.insert(id, Mark::Visiting);
            if let Some(task) = nodes.get(&id) {
                for dep in &task.depends_on {
                    visit(*dep, nodes, marks)?;
                }
            }
            marks.insert(id, Mark::Done);
            Ok(())
        }

        for id in self.nodes.keys().copied() {
            visit(id, &self.nodes, &mut marks)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&Task> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut Task> {
        self.nodes.get_mut(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Direct children of `parent_id`. Order is not guaranteed (backed
    /// by a hash map); callers that need insertion order should sort by
    /// `created_at`, as [`TaskTree::depth_first_ids`] and
    /// [`crate::cli::display::render_tree`] do.
    pub fn children_of(&self, parent_id: Uuid) -> Vec<&Task> {
        self.nodes
            .values()
            .filter(|t| t.parent_id == Some(parent_id))
            .collect()
    }

    /// Root tasks (no parent).
    pub fn roots(&self) -> Vec<&Task> {
        self.nodes.values().filter(|t| t.parent_id.is_none()).collect()
    }

    /// Leaves: tasks with no children. These are the only tasks the
    /// scheduler ever dispatches workers for — internal nodes exist
    /// purely for tree structure once they've been split.
    pub fn leaves(&self) -> Vec<&Task> {
        let parent_ids: HashSet<Uuid> = self.nodes.values().filter_map(|t| t.parent_id).collect();
        self.nodes
            .values()
            .filter(|t| !parent_ids.contains(&t.id))
            .collect()
    }

    /// All task ids in depth-first pre-order starting from the roots,
    /// children visited in insertion order (by `created_at`) rather than
    /// by id, so the order is stable and matches the order tasks were
    /// created in.
    pub fn depth_first_ids(&self) -> Vec<Uuid> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut visited = HashSet::new();
        let mut roots: Vec<&Task> = self.roots();
        roots.sort_by_key(|t| t.created_at);
        for root in roots {
            self.dfs_from(root.id, &mut visited, &mut order);
        }
        order
    }

    fn dfs_from(&self, id: Uuid, visited: &mut HashSet<Uuid>, order: &mut Vec<Uuid>) {
        if !visited.insert(id) {
            return;
        }
        order.push(id);
        let mut children: Vec<&Task> = self.children_of(id);
        children.sort_by_key(|t| t.created_at);
        for child in children {
            self.dfs_from(child.id, visited, order);
        }
    }

    /// The set of ids whose status is `Approved`.
    #[must_use]
    pub fn approved_ids(&self) -> HashSet<Uuid> {
        self.nodes
            .values()
            .filter(|t| t.status.is_approved())
            .map(|t| t.id)
            .collect()
    }

    /// Transition every `Blocked` task whose dependencies are now all
    /// `Approved` to `Pending`, so it becomes visible to
    /// [`TaskTree::dispatchable`]. Returns the ids that were unblocked.
    ///
    /// # Errors
    /// Propagates [`DomainError::InvalidStateTransition`] if a blocked
    /// task's guarded transition is somehow rejected (unreachable given
    /// [`TaskStatus::can_transition_to`]'s `Blocked -> Pending` rule).
    pub fn unblock_ready(&mut self) -> DomainResult<Vec<Uuid>> {
        let approved = self.approved_ids();
        let to_unblock: Vec<Uuid> = self
            .nodes
            .values()
            .filter(|t| t.status == TaskStatus::Blocked && t.dependencies_satisfied(&approved))
            .map(|t| t.id)
            .collect();

        for id in &to_unblock {
            if let Some(task) = self.nodes.get_mut(id) {
                task.transition_to(TaskStatus::Pending, None)?;
            }
        }
        Ok(to_unblock)
    }

    /// Leaves ready for dispatch: not terminal, dependencies satisfied.
    pub fn dispatchable(&self) -> Vec<&Task> {
        let approved = self.approved_ids();
        self.leaves()
            .into_iter()
            .filter(|t| t.status.is_ready_for_dispatch() && t.dependencies_satisfied(&approved))
            .collect()
    }

    /// Update a task's status through the guarded transition, recording
    /// a checkpoint. Enforces invariant (d): approving a task whose
    /// dependencies are not all approved is a fatal invariant violation.
    ///
    /// # Errors
    /// [`DomainError::TaskNotFound`], [`DomainError::InvalidStateTransition`],
    /// or [`DomainError::ApprovedWithUnapprovedDependency`].
    pub fn update_status(
        &mut self,
        id: Uuid,
        next: TaskStatus,
        note: Option<String>,
    ) -> DomainResult<()> {
        if next == TaskStatus::Approved {
            let approved = self.approved_ids();
            let task = self.nodes.get(&id).ok_or(DomainError::TaskNotFound(id))?;
            for dep in &task.depends_on {
                if !approved.contains(dep) {
                    return Err(DomainError::ApprovedWithUnapprovedDependency(id, *dep));
                }
            }
        }
        let task = self.nodes.get_mut(&id).ok_or(DomainError::TaskNotFound(id))?;
        task.transition_to(next, note)
    }

    /// All tasks, for persistence snapshots.
    pub fn all(&self) -> impl Iterator<Item = &Task> {
        self.nodes.values()
    }
}
