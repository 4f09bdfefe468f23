//! Benchmarks the granularity controller's scoring/decision functions,
//! the one hot-path component with no I/O (spec §4.1: invoked whenever
//! a task is created or a sibling group changes).

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use uuid::Uuid;

use abathur_orch::domain::models::config::GranularityConfig;
use abathur_orch::domain::models::Task;
use abathur_orch::services::GranularityController;

fn make_task(words: usize, depth: u32) -> Task {
    let description = "word ".repeat(words);
    let mut task = Task::new(Uuid::new_v4(), "core", "bench task", description, vec![], depth);
    task.acceptance_tests = vec!["criterion one".to_string(), "criterion two".to_string()];
    task
}

fn bench_score(c: &mut Criterion) {
    let controller = GranularityController::new(GranularityConfig::default());
    let task = make_task(120, 2);

    c.bench_function("granularity_score", |b| {
        b.iter(|| black_box(controller.score(black_box(&task), None, 0)));
    });
}

fn bench_decide(c: &mut Criterion) {
    let controller = GranularityController::new(GranularityConfig::default());
    let task = make_task(400, 1);

    c.bench_function("granularity_decide", |b| {
        b.iter(|| black_box(controller.decide(black_box(&task), None, 3)));
    });
}

fn bench_overlap(c: &mut Criterion) {
    let a = make_task(60, 1);
    let b = make_task(60, 1);

    c.bench_function("granularity_related_group_overlap", |bencher| {
        bencher.iter(|| black_box(GranularityController::related_group_overlap(black_box(&a), black_box(&b))));
    });
}

criterion_group!(benches, bench_score, bench_decide, bench_overlap);
criterion_main!(benches);
