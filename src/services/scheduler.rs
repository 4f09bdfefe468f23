//! The scheduler: the continuous work-stealing loop that dispatches
//! ready tasks to workers, routes their outcomes through the reviewer,
//! and retries failures within budget (spec §4.3).
//!
//! Grounded on the teacher's `services/dag_executor.rs` (wave-based
//! execution grouping) and `application/swarm_orchestrator.rs`
//! (dispatch-and-drain loop), generalized from discrete waves to a
//! continuous loop driven by a `tokio::task::JoinSet`, a concurrency
//! semaphore, and a `watch::Receiver<ControlSignal>` so pause/resume/
//! cancel can be applied without tearing down in-flight workers.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{watch, Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{DependencyOutput, ReviewVerdict, Task, TaskStatus, TaskTree};
use crate::domain::ports::TaskRepository;
use crate::services::context_collector::ContextCollector;
use crate::services::reviewer::Reviewer;
use crate::services::sandbox::SandboxManager;
use crate::services::worker::Worker;

/// Operator-driven control signal (spec §6 `pause`/`resume`/`cancel`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    Run,
    Paused,
    Cancelled,
}

/// Per-run tunables not already covered by `GranularityConfig`/`ReviewerConfig`.
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    pub concurrency_limit: usize,
    pub worker_allowed_tools: Vec<String>,
    pub worker_max_turns: u32,
}

/// Drives a [`TaskTree`] to completion.
pub struct Scheduler {
    tree: Arc<Mutex<TaskTree>>,
    repository: Arc<dyn TaskRepository>,
    worker: Arc<Worker>,
    reviewer: Arc<Reviewer>,
    sandboxes: Arc<SandboxManager>,
    context_collector: Arc<ContextCollector>,
    source_root: PathBuf,
    options: SchedulerOptions,
    control: watch::Receiver<ControlSignal>,
}

impl Scheduler {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tree: Arc<Mutex<TaskTree>>,
        repository: Arc<dyn TaskRepository>,
        worker: Arc<Worker>,
        reviewer: Arc<Reviewer>,
        sandboxes: Arc<SandboxManager>,
        context_collector: Arc<ContextCollector>,
        source_root: PathBuf,
        options: SchedulerOptions,
        control: watch::Receiver<ControlSignal>,
    ) -> Self {
        Self {
            tree,
            repository,
            worker,
            reviewer,
            sandboxes,
            context_collector,
            source_root,
            options,
            control,
        }
    }

    /// Run until every task reaches a terminal state or the control
    /// channel signals cancellation.
    ///
    /// # Errors
    /// Propagates a [`crate::domain::errors::DomainError`] if tree
    /// bookkeeping (status transitions, repository writes) fails in a
    /// way that isn't itself recoverable as a task-level retry.
    #[instrument(skip(self))]
    pub async fn run(&self) -> DomainResult<()> {
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency_limit.max(1)));
        let mut in_flight: JoinSet<(Uuid, DomainResult<TaskOutcome>)> = JoinSet::new();
        let mut dispatched: HashMap<Uuid, ()> = HashMap::new();

        loop {
            if *self.control.borrow() == ControlSignal::Cancelled {
                info!("scheduler received cancel signal, draining in-flight work");
                break;
            }
            if *self.control.borrow() == ControlSignal::Paused {
                tokio::time::sleep(std::time::Duration::from_millis(200)).await;
                continue;
            }

            let ready = {
                let tree = self.tree.lock().await;
                tree.dispatchable()
                    .into_iter()
                    .filter(|t| !dispatched.contains_key(&t.id))
                    .cloned()
                    .collect::<Vec<_>>()
            };

            for task in ready {
                let permit = Arc::clone(&semaphore);
                dispatched.insert(task.id, ());
                let dependency_outputs = self.dependency_outputs_for(&task).await;
                let worker = Arc::clone(&self.worker);
                let reviewer = Arc::clone(&self.reviewer);
                let sandboxes = Arc::clone(&self.sandboxes);
                let context_collector = Arc::clone(&self.context_collector);
                let source_root = self.source_root.clone();
                let allowed_tools = self.options.worker_allowed_tools.clone();
                let max_turns = self.options.worker_max_turns;

                in_flight.spawn(async move {
                    let _permit = permit.acquire_owned().await.expect("semaphore not closed");
                    let outcome = run_one_task(
                        &task,
                        &worker,
                        &reviewer,
                        &sandboxes,
                        &context_collector,
                        &source_root,
                        dependency_outputs,
                        allowed_tools,
                        max_turns,
                    )
                    .await;
                    (task.id, outcome)
                });
            }

            if in_flight.is_empty() {
                let all_terminal = {
                    let tree = self.tree.lock().await;
                    tree.all().all(|t| t.status.is_terminal())
                };
                if all_terminal {
                    info!("all tasks reached a terminal state");
                    break;
                }
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                continue;
            }

            if let Some(joined) = in_flight.join_next().await {
                match joined {
                    Ok((task_id, outcome)) => {
                        self.apply_outcome(task_id, outcome, &mut dispatched).await?;
                    }
                    Err(join_err) => {
                        error!(error = %join_err, "worker task panicked");
                    }
                }
            }
        }

        while let Some(joined) = in_flight.join_next().await {
            if let Ok((task_id, outcome)) = joined {
                self.apply_outcome(task_id, outcome, &mut dispatched).await?;
            }
        }
        Ok(())
    }

    async fn dependency_outputs_for(&self, task: &Task) -> Vec<DependencyOutput> {
        let tree = self.tree.lock().await;
        task.depends_on
            .iter()
            .filter_map(|id| tree.get(*id))
            .map(|dep| DependencyOutput {
                task_id: dep.id,
                title: dep.title.clone(),
                files: vec![],
                summary: dep
                    .checkpoints
                    .last()
                    .and_then(|c| c.note.clone())
                    .unwrap_or_default(),
            })
            .collect()
    }

    async fn apply_outcome(
        &self,
        task_id: Uuid,
        outcome: DomainResult<TaskOutcome>,
        dispatched: &mut HashMap<Uuid, ()>,
    ) -> DomainResult<()> {
        dispatched.remove(&task_id);
        let mut tree = self.tree.lock().await;

        match outcome {
            Ok(TaskOutcome::Approved(note)) => {
                tree.update_status(task_id, TaskStatus::Passed, None)?;
                tree.update_status(task_id, TaskStatus::Approved, Some(note))?;
            }
            Ok(TaskOutcome::Rejected(note)) => {
                let task = tree.get_mut(task_id);
                if let Some(task) = task {
                    if task.retries_exhausted() {
                        task.transition_to(TaskStatus::Rejected, Some(note))?;
                    } else {
                        task.retry(note)?;
                    }
                }
            }
            Ok(TaskOutcome::TestFailed(note)) => {
                let task = tree.get_mut(task_id);
                if let Some(task) = task {
                    task.transition_to(TaskStatus::TestFailed, Some(note.clone()))?;
                    if !task.retries_exhausted() {
                        task.retry(note)?;
                    }
                }
            }
            Err(e) => {
                warn!(task_id = %task_id, error = %e, "task execution failed");
                if let Some(task) = tree.get_mut(task_id) {
                    task.force_status(TaskStatus::Cancelled, Some(e.to_string()));
                }
            }
        }

        if let Some(task) = tree.get(task_id) {
            self.repository.update(task, task.version.saturating_sub(1)).await?;
        }

        let unblocked_ids = tree.unblock_ready()?;
        for id in unblocked_ids {
            if let Some(task) = tree.get(id) {
                self.repository.update(task, task.version.saturating_sub(1)).await?;
            }
        }
        Ok(())
    }
}

enum TaskOutcome {
    Approved(String),
    Rejected(String),
    TestFailed(String),
}

#[allow(clippy::too_many_arguments)]
async fn run_one_task(
    task: &Task,
    worker: &Worker,
    reviewer: &Reviewer,
    sandboxes: &SandboxManager,
    context_collector: &ContextCollector,
    source_root: &std::path::Path,
    dependency_outputs: Vec<DependencyOutput>,
    allowed_tools: Vec<String>,
    max_turns: u32,
) -> DomainResult<TaskOutcome> {
    let sandbox = sandboxes.copy_in(task.id, source_root).await?;
    let context = context_collector
        .collect(&sandbox.path, dependency_outputs)
        .await?;

    let summary = worker
        .execute(
            task.id,
            &task.title,
            &task.description,
            &sandbox.path,
            context,
            allowed_tools,
            max_turns,
        )
        .await?;

    if !summary.succeeded {
        sandboxes.teardown(task.id).await?;
        return Ok(TaskOutcome::TestFailed(
            summary.error.unwrap_or_else(|| "worker run failed".to_string()),
        ));
    }

    let sync_result = sandboxes.sync_back(&sandbox, source_root).await?;
    sandboxes.teardown(task.id).await?;

    if !sync_result.is_clean() {
        return Ok(TaskOutcome::TestFailed(format!(
            "{} file(s) conflicted during sync-back",
            sync_result.conflicts.len()
        )));
    }

    let review = reviewer
        .review(task.id, &task.title, &task.acceptance_tests, source_root)
        .await?;

    match review.verdict {
        ReviewVerdict::Passed => Ok(TaskOutcome::Approved(review.reasoning)),
        ReviewVerdict::Failed => Ok(TaskOutcome::Rejected(review.reasoning)),
        ReviewVerdict::NeedsRevision => Ok(TaskOutcome::TestFailed(review.reasoning)),
    }
}
