//! The task node and its status lifecycle (spec §3).
//!
//! Grounded on the teacher's `domain/models/task.rs`: builder-style
//! construction, a `transition_to` guard over a `valid_transitions`
//! table, and a `force_status` escape hatch for operator overrides.
//! Field set replaced to match this system's task shape (module
//! binding, tree depth, acceptance tests, checkpoints, idempotency).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};

/// Where a task came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskSource {
    /// Created directly by an operator.
    Human,
    /// Created by the orchestrator itself (e.g. granularity-controller split).
    System,
    /// Created as a subtask of another task during decomposition/splitting.
    SubtaskOf(Uuid),
}

/// The lifecycle state of a task (spec §3).
///
/// Transitions are validated by [`TaskStatus::can_transition_to`]; callers
/// that need to bypass the guard (operator `adjust`/`cancel` commands) use
/// [`Task::force_status`] instead of [`Task::transition_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created but blocked on at least one unapproved dependency.
    Blocked,
    /// All dependencies approved; eligible for scheduling.
    Pending,
    /// A worker is writing the acceptance test for this task.
    TestWriting,
    /// A worker is implementing the task.
    Coding,
    /// The implementation is being run against its acceptance test.
    Testing,
    /// The acceptance test failed; eligible for retry.
    TestFailed,
    /// Implementation passed its acceptance test, awaiting review.
    Passed,
    /// An independent reviewer approved the task.
    Approved,
    /// An independent reviewer rejected the task.
    Rejected,
    /// Cancelled by an operator or because an ancestor was cancelled.
    Cancelled,
}

impl TaskStatus {
    /// Whether the transition from `self` to `next` is permitted.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        use TaskStatus::{
            Approved, Blocked, Cancelled, Coding, Passed, Pending, Rejected, TestFailed, Testing,
            TestWriting,
        };
        match self {
            Blocked => matches!(next, Pending | Cancelled),
            Pending => matches!(next, TestWriting | Cancelled),
            TestWriting => matches!(next, Coding | Cancelled),
            Coding => matches!(next, Testing | Cancelled),
            Testing => matches!(next, Passed | TestFailed | Cancelled),
            TestFailed => matches!(next, Coding | Rejected | Cancelled),
            Passed => matches!(next, Approved | Rejected | Cancelled),
            Rejected => matches!(next, Coding | Cancelled),
            Approved | Cancelled => false,
        }
    }

    /// Whether this status represents a terminal, successful outcome.
    #[must_use]
    pub const fn is_approved(self) -> bool {
        matches!(self, Self::Approved)
    }

    /// Whether this status is terminal (no further transitions possible).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Cancelled)
    }

    /// Whether the scheduler may dispatch a worker for a task in this state.
    #[must_use]
    pub const fn is_ready_for_dispatch(self) -> bool {
        matches!(self, Self::Pending | Self::TestFailed | Self::Rejected)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Blocked => "blocked",
            Self::Pending => "pending",
            Self::TestWriting => "test_writing",
            Self::Coding => "coding",
            Self::Testing => "testing",
            Self::TestFailed => "test_failed",
            Self::Passed => "passed",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// A point-in-time snapshot recorded whenever a task crosses a status
/// boundary, used for the CLI's `task` inspection view and for resuming
/// a run after a crash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// The status the task moved into.
    pub status: TaskStatus,
    /// When the transition happened.
    pub at: DateTime<Utc>,
    /// Optional free-form note (retry reason, rejection summary, ...).
    pub note: Option<String>,
}

/// A unit of work in the task tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique id.
    pub id: Uuid,
    /// Blueprint this task belongs to.
    pub blueprint_id: Uuid,
    /// Module this task implements a piece of.
    pub module_id: String,
    /// Parent task, if this is a subtask. `None` for top-level tasks.
    pub parent_id: Option<Uuid>,
    /// Other tasks that must reach `Approved` before this one may run.
    pub depends_on: Vec<Uuid>,
    /// Short human-readable title.
    pub title: String,
    /// Full description of the work.
    pub description: String,
    /// Current lifecycle state.
    pub status: TaskStatus,
    /// Provenance.
    pub source: TaskSource,
    /// Depth in the task tree (0 = top-level).
    pub depth: u32,
    /// Acceptance criteria the implementation must satisfy.
    pub acceptance_tests: Vec<String>,
    /// The test specification/code written during `TestWriting`, if any.
    pub test_spec: Option<String>,
    /// History of status transitions.
    pub checkpoints: Vec<Checkpoint>,
    /// How many times this task has been retried after a failure.
    pub retry_count: u32,
    /// Maximum retries before the scheduler gives up and leaves it
    /// `Rejected`/`TestFailed` for operator attention.
    pub max_retries: u32,
    /// Stable key used to deduplicate re-submission of the same
    /// logical task (e.g. after a crash-restart replay).
    pub idempotency_key: String,
    /// Optimistic-concurrency version, bumped on every persisted update.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Construct a new, blocked-by-default task. Callers move it to
    /// `Pending` once dependency approval is confirmed (or directly, if
    /// `depends_on` is empty — see [`Task::new`]'s initial status logic).
    #[must_use]
    pub fn new(
        blueprint_id: Uuid,
        module_id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        depends_on: Vec<Uuid>,
        depth: u32,
    ) -> Self {
        let now = Utc::now();
        let initial_status = if depends_on.is_empty() {
            TaskStatus::Pending
        } else {
            TaskStatus::Blocked
        };
        Self {
            id: Uuid::new_v4(),
            blueprint_id,
            module_id: module_id.into(),
            parent_id: None,
            depends_on,
            title: title.into(),
            description: description.into(),
            status: initial_status,
            source: TaskSource::System,
            depth,
            acceptance_tests: Vec::new(),
            test_spec: None,
            checkpoints: vec![Checkpoint {
                status: initial_status,
                at: now,
                note: None,
            }],
            retry_count: 0,
            max_retries: 3,
            idempotency_key: Uuid::new_v4().to_string(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder: set the parent and provenance for a subtask.
    #[must_use]
    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self.source = TaskSource::SubtaskOf(parent_id);
        self
    }

    /// Builder: set the source explicitly (e.g. `TaskSource::Human`).
    #[must_use]
    pub fn with_source(mut self, source: TaskSource) -> Self {
        self.source = source;
        self
    }

    /// Builder: attach acceptance tests at construction time.
    #[must_use]
    pub fn with_acceptance_tests(mut self, tests: Vec<String>) -> Self {
        self.acceptance_tests = tests;
        self
    }

    /// Builder: override the retry budget.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Attempt a guarded transition, recording a checkpoint on success.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidStateTransition`] if the transition
    /// is not permitted from the current state.
    pub fn transition_to(&mut self, next: TaskStatus, note: Option<String>) -> DomainResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition {
                task_id: self.id,
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.force_status(next, note);
        Ok(())
    }

    /// Unconditionally set the status, bypassing the transition guard.
    /// Used for operator-driven `cancel`/`adjust` commands (spec §6),
    /// which must be able to move a task to `Cancelled` from any state.
    pub fn force_status(&mut self, next: TaskStatus, note: Option<String>) {
        self.status = next;
        self.updated_at = Utc::now();
        self.version += 1;
        self.checkpoints.push(Checkpoint {
            status: next,
            at: self.updated_at,
            note,
        });
    }

    /// Record a retry: increments `retry_count` and moves back to
    /// `Coding` so the worker re-attempts implementation.
    ///
    /// # Errors
    /// Propagates [`Task::transition_to`]'s error if called from a state
    /// that cannot reach `Coding`.
    pub fn retry(&mut self, note: impl Into<String>) -> DomainResult<()> {
        self.retry_count += 1;
        self.transition_to(TaskStatus::Coding, Some(note.into()))
    }

    /// Whether this task has exhausted its retry budget.
    #[must_use]
    pub const fn retries_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }

    /// Whether every id in `depends_on` is present and approved in
    /// `approved_ids`.
    #[must_use]
    pub fn dependencies_satisfied(&self, approved_ids: &std::collections::HashSet<Uuid>) -> bool {
        self.depends_on.iter().all(|d| approved_ids.contains(d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blueprint_id() -> Uuid {
        Uuid::new_v4()
    }

    #[test]
    fn new_task_with_no_deps_starts_pending() {
        let task = Task::new(blueprint_id(), "core", "do thing", "desc", vec![], 0);
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.checkpoints.len(), 1);
    }

    #[test]
    fn new_task_with_deps_starts_blocked() {
        let task = Task::new(blueprint_id(), "core", "do thing", "desc", vec![Uuid::new_v4()], 0);
        assert_eq!(task.status, TaskStatus::Blocked);
    }

    #[test]
    fn valid_transition_chain_succeeds() {
        let mut task = Task::new(blueprint_id(), "core", "t", "d", vec![], 0);
        task.transition_to(TaskStatus::TestWriting, None).unwrap();
        task.transition_to(TaskStatus::Coding, None).unwrap();
        task.transition_to(TaskStatus::Testing, None).unwrap();
        task.transition_to(TaskStatus::Passed, None).unwrap();
        task.transition_to(TaskStatus::Approved, None).unwrap();
        assert_eq!(task.status, TaskStatus::Approved);
        assert_eq!(task.version, 6);
    }

    #[test]
    fn invalid_transition_is_rejected() {
        let mut task = Task::new(blueprint_id(), "core", "t", "d", vec![], 0);
        let err = task.transition_to(TaskStatus::Approved, None).unwrap_err();
        assert!(matches!(err, DomainError::InvalidStateTransition { .. }));
        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[test]
    fn approved_and_cancelled_are_terminal() {
        assert!(TaskStatus::Approved.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
    }

    #[test]
    fn force_status_bypasses_guard() {
        let mut task = Task::new(blueprint_id(), "core", "t", "d", vec![], 0);
        task.force_status(TaskStatus::Cancelled, Some("operator cancel".into()));
        assert_eq!(task.status, TaskStatus::Cancelled);
    }

    #[test]
    fn retry_increments_count_and_returns_to_coding() {
        let mut task = Task::new(blueprint_id(), "core", "t", "d", vec![], 0);
        task.transition_to(TaskStatus::TestWriting, None).unwrap();
        task.transition_to(TaskStatus::Coding, None).unwrap();
        task.transition_to(TaskStatus::Testing, None).unwrap();
        task.transition_to(TaskStatus::TestFailed, None).unwrap();
        task.retry("acceptance test failed").unwrap();
        assert_eq!(task.retry_count, 1);
        assert_eq!(task.status, TaskStatus::Coding);
    }

    #[test]
    fn retries_exhausted_at_max() {
        let mut task = Task::new(blueprint_id(), "core", "t", "d", vec![], 0).with_max_retries(1);
        assert!(!task.retries_exhausted());
        task.retry_count = 1;
        assert!(task.retries_exhausted());
    }

    #[test]
    fn dependencies_satisfied_checks_full_set() {
        let dep_a = Uuid::new_v4();
        let dep_b = Uuid::new_v4();
        let task = Task::new(blueprint_id(), "core", "t", "d", vec![dep_a, dep_b], 1);
        let mut approved = std::collections::HashSet::new();
        approved.insert(dep_a);
        assert!(!task.dependencies_satisfied(&approved));
        approved.insert(dep_b);
        assert!(task.dependencies_satisfied(&approved));
    }
}
