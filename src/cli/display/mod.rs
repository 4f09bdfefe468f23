//! Terminal rendering for task lists, trees, and individual task detail.

use comfy_table::{presets::UTF8_FULL, Cell, Table};
use console::style;

use crate::domain::models::{Task, TaskStatus, TaskTree};
use crate::services::AdjustmentResult;

fn status_cell(status: TaskStatus) -> Cell {
    let text = status.to_string();
    let styled = match status {
        TaskStatus::Approved => style(text).green().to_string(),
        TaskStatus::Rejected | TaskStatus::Cancelled => style(text).red().to_string(),
        TaskStatus::TestFailed => style(text).yellow().to_string(),
        _ => style(text).cyan().to_string(),
    };
    Cell::new(styled)
}

/// Render a flat task list as a table.
#[must_use]
pub fn render_task_table(tasks: &[Task]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "ID", "Title", "Status", "Depth", "Retries", "Module",
    ]);

    for task in tasks {
        table.add_row(vec![
            Cell::new(short_id(task.id)),
            Cell::new(&task.title),
            status_cell(task.status),
            Cell::new(task.depth),
            Cell::new(format!("{}/{}", task.retry_count, task.max_retries)),
            Cell::new(&task.module_id),
        ]);
    }

    table.to_string()
}

/// Render a single task's full detail, including checkpoint history.
#[must_use]
pub fn render_task_detail(task: &Task) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", style(&task.title).bold()));
    out.push_str(&format!("id: {}\n", task.id));
    out.push_str(&format!("status: {}\n", task.status));
    out.push_str(&format!("module: {}\n", task.module_id));
    out.push_str(&format!("depth: {}\n", task.depth));
    out.push_str(&format!("retries: {}/{}\n", task.retry_count, task.max_retries));
    out.push_str(&format!("\n{}\n", task.description));

    if !task.acceptance_tests.is_empty() {
        out.push_str("\nacceptance criteria:\n");
        for (i, test) in task.acceptance_tests.iter().enumerate() {
            out.push_str(&format!("  {}. {test}\n", i + 1));
        }
    }

    out.push_str("\ncheckpoints:\n");
    for checkpoint in &task.checkpoints {
        out.push_str(&format!(
            "  {} -> {}{}\n",
            checkpoint.at.format("%Y-%m-%d %H:%M:%S"),
            checkpoint.status,
            checkpoint
                .note
                .as_ref()
                .map(|n| format!(" ({n})"))
                .unwrap_or_default()
        ));
    }

    out
}

/// Render the task tree as indented text, roots first.
#[must_use]
pub fn render_tree(tree: &TaskTree) -> String {
    let mut out = String::new();
    let mut roots: Vec<_> = tree.roots();
    roots.sort_by_key(|t| t.created_at);
    for root in roots {
        render_node(tree, root, 0, &mut out);
    }
    out
}

fn render_node(tree: &TaskTree, task: &Task, indent: usize, out: &mut String) {
    out.push_str(&"  ".repeat(indent));
    out.push_str(&format!("- [{}] {} ({})\n", short_id(task.id), task.title, task.status));
    let mut children = tree.children_of(task.id);
    children.sort_by_key(|t| t.created_at);
    for child in children {
        render_node(tree, child, indent + 1, out);
    }
}

fn short_id(id: uuid::Uuid) -> String {
    id.to_string()[..8].to_string()
}

/// Render a granularity dry-run: scores, split suggestions, merge
/// suggestions, and structural diagnostics.
#[must_use]
pub fn render_adjustment_result(result: &AdjustmentResult) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} ({} task(s) would split on the next pass)\n",
        style("granularity report").bold(),
        result.would_split
    ));

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["ID", "Score", "Est. lines", "Est. minutes"]);
    let mut scored: Vec<_> = result.report.scores.iter().collect();
    scored.sort_by_key(|(id, _)| **id);
    for (id, score) in scored {
        table.add_row(vec![
            Cell::new(short_id(*id)),
            Cell::new(format!("{:.1}", score.value)),
            Cell::new(format!("{:.0}", score.estimated_lines)),
            Cell::new(format!("{:.0}", score.estimated_duration_minutes)),
        ]);
    }
    out.push_str(&table.to_string());
    out.push('\n');

    if !result.report.suggestions.is_empty() {
        out.push_str("\nsplit suggestions:\n");
        for s in &result.report.suggestions {
            out.push_str(&format!(
                "  {} {:?}: {}\n",
                short_id(s.task_id),
                s.strategy,
                s.parts.join(", ")
            ));
        }
    }

    if !result.report.merges.is_empty() {
        out.push_str("\nmerge suggestions:\n");
        for m in &result.report.merges {
            let ids: Vec<String> = m.task_ids.iter().map(|id| short_id(*id)).collect();
            out.push_str(&format!("  [{}]: {}\n", ids.join(", "), m.reason));
        }
    }

    if !result.report.issues.is_empty() {
        out.push_str("\nstructural issues:\n");
        for issue in &result.report.issues {
            out.push_str(&format!(
                "  {:?} ({:?}){}: {}\n",
                issue.kind,
                issue.severity,
                issue.task_id.map(|id| format!(" {}", short_id(id))).unwrap_or_default(),
                issue.detail
            ));
        }
    }

    out
}
