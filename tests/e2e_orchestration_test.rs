//! End-to-end orchestration scenarios (spec §8) driven entirely through
//! [`MockAgentRunner`] scripts and an in-memory [`TaskRepository`], with
//! real sandboxes on a [`tempfile::TempDir`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

use abathur_orch::domain::errors::DomainResult;
use abathur_orch::domain::models::config::{Config, ReviewStrictness};
use abathur_orch::domain::models::{AgentEvent, Task, TaskStatus, TaskTree};
use abathur_orch::domain::ports::TaskRepository;
use abathur_orch::infrastructure::substrates::MockAgentRunner;
use abathur_orch::services::{
    ContextCollector, ControlSignal, Reviewer, SandboxManager, Scheduler, SchedulerOptions, Worker,
};

#[derive(Default)]
struct InMemoryTaskRepository {
    tasks: Mutex<HashMap<Uuid, Task>>,
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn create(&self, task: &Task) -> DomainResult<()> {
        self.tasks.lock().await.insert(task.id, task.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Task>> {
        Ok(self.tasks.lock().await.get(&id).cloned())
    }

    async fn update(&self, task: &Task, _expected_version: i64) -> DomainResult<()> {
        self.tasks.lock().await.insert(task.id, task.clone());
        Ok(())
    }

    async fn list_by_blueprint(&self, blueprint_id: Uuid) -> DomainResult<Vec<Task>> {
        Ok(self
            .tasks
            .lock()
            .await
            .values()
            .filter(|t| t.blueprint_id == blueprint_id)
            .cloned()
            .collect())
    }

    async fn find_by_idempotency_key(&self, key: &str) -> DomainResult<Option<Task>> {
        Ok(self
            .tasks
            .lock()
            .await
            .values()
            .find(|t| t.idempotency_key == key)
            .cloned())
    }
}

fn passing_verdict_event() -> AgentEvent {
    let body = serde_json::json!({
        "verdict": "passed",
        "confidence": 0.9,
        "reasoning": "acceptance criteria satisfied",
        "verified_items": [],
        "issues": [],
        "suggestions": []
    })
    .to_string();
    AgentEvent::ToolEnd {
        name: "submit_verdict".to_string(),
        success: true,
        output_excerpt: body,
        persisted_output_path: None,
    }
}

fn failing_then_passing_verdict_events() -> Vec<Vec<AgentEvent>> {
    let failed_body = serde_json::json!({
        "verdict": "failed",
        "confidence": 0.8,
        "reasoning": "acceptance test not met",
        "verified_items": [],
        "issues": [{"description": "missing edge case", "file": null}],
        "suggestions": []
    })
    .to_string();
    vec![
        vec![AgentEvent::ToolEnd {
            name: "submit_verdict".to_string(),
            success: true,
            output_excerpt: failed_body,
            persisted_output_path: None,
        }],
        vec![passing_verdict_event()],
    ]
}

fn coding_done_script() -> Vec<AgentEvent> {
    vec![AgentEvent::TextChunk("implemented".to_string()), AgentEvent::Done]
}

async fn run_scheduler_to_completion(
    tree: TaskTree,
    repo: Arc<InMemoryTaskRepository>,
    worker_runner: Arc<MockAgentRunner>,
    reviewer_runner: Arc<MockAgentRunner>,
) -> TaskTree {
    let source = tempfile::tempdir().unwrap();
    tokio::fs::write(source.path().join("main.rs"), b"fn main() {}\n").await.unwrap();
    let sandbox_dir = tempfile::tempdir().unwrap();
    let output_dir = tempfile::tempdir().unwrap();

    let config = Config::default();
    let tree = Arc::new(Mutex::new(tree));
    let worker = Arc::new(Worker::new(worker_runner, output_dir.path().to_path_buf()));
    let reviewer = Arc::new(Reviewer::new(reviewer_runner, ReviewStrictness::Normal, 10));
    let sandboxes = Arc::new(SandboxManager::new(sandbox_dir.path().to_path_buf()));
    let context_collector = Arc::new(ContextCollector::new(config.context.clone()));
    let (_tx, rx) = watch::channel(ControlSignal::Run);

    let scheduler = Scheduler::new(
        Arc::clone(&tree),
        repo,
        worker,
        reviewer,
        sandboxes,
        context_collector,
        source.path().to_path_buf(),
        SchedulerOptions {
            concurrency_limit: 2,
            worker_allowed_tools: vec!["bash".to_string()],
            worker_max_turns: 5,
        },
        rx,
    );

    scheduler.run().await.unwrap();
    Arc::try_unwrap(tree).unwrap().into_inner()
}

#[tokio::test]
async fn single_task_runs_to_approval() {
    let task = Task::new(Uuid::new_v4(), "core", "do the thing", "implement the thing", vec![], 0);
    let task_id = task.id;
    let tree = TaskTree::from_nodes(vec![task]).unwrap();
    let repo = Arc::new(InMemoryTaskRepository::default());

    let worker_runner = Arc::new(MockAgentRunner::repeating(coding_done_script()));
    let reviewer_runner = Arc::new(MockAgentRunner::repeating(vec![passing_verdict_event()]));

    let tree = run_scheduler_to_completion(tree, repo, worker_runner, reviewer_runner).await;
    assert_eq!(tree.get(task_id).unwrap().status, TaskStatus::Approved);
}

#[tokio::test]
async fn two_independent_siblings_both_approve() {
    let a = Task::new(Uuid::new_v4(), "core", "task a", "implement task a", vec![], 0);
    let b = Task::new(Uuid::new_v4(), "core", "task b", "implement task b", vec![], 0);
    let (a_id, b_id) = (a.id, b.id);
    let tree = TaskTree::from_nodes(vec![a, b]).unwrap();
    let repo = Arc::new(InMemoryTaskRepository::default());

    let worker_runner = Arc::new(MockAgentRunner::repeating(coding_done_script()));
    let reviewer_runner = Arc::new(MockAgentRunner::repeating(vec![passing_verdict_event()]));

    let tree = run_scheduler_to_completion(tree, repo, worker_runner, reviewer_runner).await;
    assert_eq!(tree.get(a_id).unwrap().status, TaskStatus::Approved);
    assert_eq!(tree.get(b_id).unwrap().status, TaskStatus::Approved);
}

#[tokio::test]
async fn dependent_task_waits_for_its_dependency_to_approve() {
    let upstream = Task::new(Uuid::new_v4(), "core", "db schema", "create the schema", vec![], 0);
    let upstream_id = upstream.id;
    let downstream = Task::new(
        Uuid::new_v4(),
        "core",
        "api layer",
        "build the api on top of the schema",
        vec![upstream_id],
        0,
    );
    let downstream_id = downstream.id;
    assert_eq!(downstream.status, TaskStatus::Blocked);

    let tree = TaskTree::from_nodes(vec![upstream, downstream]).unwrap();
    let repo = Arc::new(InMemoryTaskRepository::default());

    let worker_runner = Arc::new(MockAgentRunner::repeating(coding_done_script()));
    let reviewer_runner = Arc::new(MockAgentRunner::repeating(vec![passing_verdict_event()]));

    let tree = run_scheduler_to_completion(tree, repo, worker_runner, reviewer_runner).await;
    assert_eq!(tree.get(upstream_id).unwrap().status, TaskStatus::Approved);
    assert_eq!(tree.get(downstream_id).unwrap().status, TaskStatus::Approved);
}

#[tokio::test]
async fn rejected_review_retries_then_approves_within_budget() {
    let task = Task::new(Uuid::new_v4(), "core", "flaky feature", "implement the flaky feature", vec![], 0)
        .with_max_retries(3);
    let task_id = task.id;
    let tree = TaskTree::from_nodes(vec![task]).unwrap();
    let repo = Arc::new(InMemoryTaskRepository::default());

    let worker_runner = Arc::new(MockAgentRunner::repeating(coding_done_script()));
    let reviewer_runner = Arc::new(MockAgentRunner::new(failing_then_passing_verdict_events()));

    let tree = run_scheduler_to_completion(tree, repo, worker_runner, reviewer_runner).await;
    let task = tree.get(task_id).unwrap();
    assert_eq!(task.status, TaskStatus::Approved);
    assert_eq!(task.retry_count, 1);
}

#[tokio::test]
async fn worker_failure_leaves_task_test_failed_or_retried() {
    let task = Task::new(Uuid::new_v4(), "core", "broken task", "this will fail", vec![], 0)
        .with_max_retries(0);
    let task_id = task.id;
    let tree = TaskTree::from_nodes(vec![task]).unwrap();
    let repo = Arc::new(InMemoryTaskRepository::default());

    let worker_runner = Arc::new(MockAgentRunner::repeating(vec![AgentEvent::Error(
        "compile error".to_string(),
    )]));
    let reviewer_runner = Arc::new(MockAgentRunner::repeating(vec![passing_verdict_event()]));

    let tree = run_scheduler_to_completion(tree, repo, worker_runner, reviewer_runner).await;
    let task = tree.get(task_id).unwrap();
    assert_eq!(task.status, TaskStatus::TestFailed);
    assert!(task.retries_exhausted());
}
