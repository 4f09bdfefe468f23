//! The granularity controller: decides whether a task is appropriately
//! sized, too coarse (should split), or too fine (merge candidate)
//! (spec §4.1).
//!
//! Grounded on the teacher's `services/priority_calculator.rs`: a
//! config-driven weighted score computed by a pure function, tested at
//! its boundary values in a `#[cfg(test)]` module. This is the one
//! service with no I/O and no async: it is invoked synchronously by the
//! scheduler whenever a task is created or a sibling group changes.

use std::collections::HashMap;
use std::collections::HashSet;

use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::blueprint::{ModuleType, SystemModule};
use crate::domain::models::config::GranularityConfig;
use crate::domain::models::{Config, Task, TaskTree};

/// The computed size estimate for a task: the six weighted factors
/// folded into a single 0-100 score, plus the line/duration estimates
/// the split rule checks independently.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComplexityScore {
    /// 0-100, where higher means "should probably split".
    pub value: f64,
    pub estimated_duration_minutes: f64,
    pub estimated_lines: f64,
}

/// What the controller recommends for a task given its score and its
/// position in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GranularityDecision {
    /// Complexity is within acceptable bounds; leave the task as is.
    Acceptable,
    /// Complexity is too high and the task has room to go deeper;
    /// the caller should split it into subtasks.
    Split,
    /// Complexity is too low; this task alone is a merge candidate.
    /// Whether it should actually merge with a sibling is decided at
    /// tree level by [`GranularityController::suggest_merges`].
    MergeCandidate,
}

/// A pattern-based strategy for dividing an oversized task, and the
/// proposed child names (spec §4.1 "Split suggestion strategies").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitStrategy {
    /// Description reads as a conjunction of steps; split it in two.
    ByFunction,
    /// Frontend/backend module; split by architectural layer.
    ByLayer,
    /// More than three dependencies; split integration from core logic.
    ByDependency,
    /// More than two module interfaces; one child per interface.
    ByInterface,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitSuggestion {
    pub task_id: Uuid,
    pub strategy: SplitStrategy,
    /// Proposed child task names.
    pub parts: Vec<String>,
}

/// A group of siblings the controller thinks should be merged into one
/// task, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSuggestion {
    pub parent_id: Option<Uuid>,
    pub task_ids: Vec<Uuid>,
    pub reason: String,
}

/// Severity of a structural diagnostic (spec §4.1 "Structural
/// diagnostics").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeIssueKind {
    TooDeep,
    TooShallow,
    TooManyChildren,
    Unbalanced,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeIssue {
    pub kind: TreeIssueKind,
    pub severity: IssueSeverity,
    /// `None` for tree-wide issues (currently only `Unbalanced`).
    pub task_id: Option<Uuid>,
    pub detail: String,
}

/// The full output of analyzing a tree once: per-task scores, split
/// suggestions, merge suggestions, and structural diagnostics. Spec
/// §4.1: "The controller returns suggestions and issues; applying them
/// is the orchestrator's responsibility" — `GranularityController`
/// never merges tasks itself.
#[derive(Debug, Clone, Default)]
pub struct GranularityReport {
    pub scores: HashMap<Uuid, ComplexityScore>,
    pub suggestions: Vec<SplitSuggestion>,
    pub merges: Vec<MergeSuggestion>,
    pub issues: Vec<TreeIssue>,
}

/// Result of a granularity dry-run (spec §6 `adjustGranularity(tree,
/// modules, config) -> AdjustmentResult`, exposed to the CLI/UI without
/// mutating the persisted tree).
#[derive(Debug, Clone, Default)]
pub struct AdjustmentResult {
    pub report: GranularityReport,
    /// How many leaves would split if [`GranularityController::apply_one_pass`]
    /// ran right now.
    pub would_split: usize,
}

/// Pure scoring and split/merge decision logic. Holds only its config;
/// safe to construct cheaply and call from any context.
#[derive(Debug, Clone)]
pub struct GranularityController {
    config: GranularityConfig,
}

impl GranularityController {
    #[must_use]
    pub fn new(config: GranularityConfig) -> Self {
        Self { config }
    }

    /// Construct from the full app config.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.granularity.clone())
    }

    /// Estimate a task's implementation size in lines, per spec §4.1
    /// "Line estimation": a configured baseline multiplied by a
    /// name-keyword factor, a module-type factor, a dependency
    /// multiplier, and a description-length multiplier.
    fn estimate_lines(&self, task: &Task, module: Option<&SystemModule>, deps_factor: f64) -> f64 {
        let baseline = self.config.estimated_lines_per_task;

        let title_lower = task.title.to_lowercase();
        let keyword_factor = if title_lower.contains("design") {
            0.3
        } else if title_lower.contains("test") {
            0.6
        } else if title_lower.contains("interface") {
            0.8
        } else if title_lower.contains("implement") {
            1.2
        } else {
            1.0
        };

        let module_type_factor = module.map_or(1.0, |m| match m.module_type {
            ModuleType::Frontend => 1.3,
            ModuleType::Backend => 1.1,
            ModuleType::Database => 0.7,
            ModuleType::Service | ModuleType::Infrastructure | ModuleType::Other => 1.0,
        });

        let total_deps =
            task.depends_on.len() + module.map_or(0, |m| m.dependencies.len());
        let dependency_multiplier = 1.0 + 0.1 * total_deps as f64;

        // The description-length multiplier capped at 1.5: reuses the
        // same [0,1] descriptionLength factor used in the score so the
        // two don't disagree on what "long" means.
        let description_length_multiplier = (1.0 + deps_factor.min(1.0)).min(1.5);

        baseline
            * keyword_factor
            * module_type_factor
            * dependency_multiplier
            * description_length_multiplier
    }

    /// Compute the six weighted complexity factors and fold them into a
    /// 0-100 score, plus the line/duration estimates (spec §4.1).
    #[must_use]
    pub fn score(
        &self,
        task: &Task,
        module: Option<&SystemModule>,
        children_count: usize,
    ) -> ComplexityScore {
        let description_length_factor =
            (task.description.chars().count() as f64 / 300.0).min(1.0);

        // estimate_lines needs the descriptionLength factor for its own
        // multiplier, computed first so both share one definition.
        let estimated_lines = self.estimate_lines(task, module, description_length_factor);

        let midpoint = self.config.estimated_lines_per_task;
        let code_size_factor = if midpoint > 0.0 {
            sigmoid(4.0 * (estimated_lines - midpoint) / midpoint)
        } else {
            0.5
        };

        let task_deps = task.depends_on.len();
        let module_deps = module.map_or(0, |m| m.dependencies.len());
        let dependencies_factor = ((task_deps + module_deps) as f64 / 10.0).min(1.0);

        let interfaces_factor =
            module.map_or(0.0, |m| (m.interfaces.len() as f64 / 6.0).min(1.0));

        let test_coverage_factor = ((task.acceptance_tests.len() as f64 / 6.0)
            + if task.test_spec.is_some() { 0.2 } else { 0.0 })
        .min(1.0);

        let children_count_factor = if children_count == 0 {
            0.3
        } else {
            (0.3 + 0.7 * children_count as f64 / 10.0).min(1.0)
        };

        let value_0_1 = 0.30 * code_size_factor
            + 0.20 * dependencies_factor
            + 0.15 * interfaces_factor
            + 0.15 * test_coverage_factor
            + 0.10 * description_length_factor
            + 0.10 * children_count_factor;

        let estimated_duration_minutes = (estimated_lines / 10.0)
            * (1.0
                + 0.5 * dependencies_factor
                + 0.3 * interfaces_factor
                + 0.4 * test_coverage_factor);

        ComplexityScore {
            value: (value_0_1 * 100.0).clamp(0.0, 100.0),
            estimated_duration_minutes,
            estimated_lines,
        }
    }

    /// Decide what to do with a single task given its score, depth, and
    /// children count (spec §4.1 "Split rule"/"Merge rule" per-task
    /// half). The merge half only flags a candidate; whether it
    /// actually merges with a sibling needs [`Self::suggest_merges`].
    #[must_use]
    pub fn decide(
        &self,
        task: &Task,
        module: Option<&SystemModule>,
        children_count: usize,
    ) -> GranularityDecision {
        let score = self.score(task, module, children_count);
        let is_leaf = children_count == 0;

        let can_split_deeper = task.depth < self.config.max_depth;
        let too_complex = score.value > self.config.max_task_complexity;
        let too_long = score.estimated_duration_minutes > self.config.max_task_duration;
        let too_many_children = children_count > self.config.max_children_per_node;
        let shallow_but_complex =
            task.depth < self.config.min_depth && score.value > 50.0 && is_leaf;

        if (too_complex || too_long || too_many_children || shallow_but_complex) && can_split_deeper
        {
            return GranularityDecision::Split;
        }

        let can_merge_shallower = task.depth > 0 || task.depth >= self.config.min_depth;
        if score.value < self.config.min_task_complexity && can_merge_shallower {
            return GranularityDecision::MergeCandidate;
        }
        GranularityDecision::Acceptable
    }

    /// Overlap between two tasks' descriptions, in `[0, 1]`, used to
    /// decide whether two merge candidates are related enough to merge
    /// into one task.
    ///
    /// This tokenizes on ASCII whitespace after lowercasing, which
    /// under-counts overlap for languages that do not separate words
    /// with whitespace (e.g. Chinese, Japanese). A proper fix needs a
    /// language-aware tokenizer; left as-is per spec's instruction not
    /// to guess one.
    #[must_use]
    pub fn related_group_overlap(a: &Task, b: &Task) -> f64 {
        let tokens = |t: &Task| -> HashSet<String> {
            t.description
                .to_lowercase()
                .split_whitespace()
                .map(str::to_string)
                .collect()
        };
        let set_a = tokens(a);
        let set_b = tokens(b);
        if set_a.is_empty() || set_b.is_empty() {
            return 0.0;
        }
        let intersection = set_a.intersection(&set_b).count() as f64;
        let union = set_a.union(&set_b).count() as f64;
        intersection / union
    }

    fn shared_title_keywords(a: &Task, b: &Task) -> usize {
        let words = |t: &Task| -> HashSet<String> {
            t.title.to_lowercase().split_whitespace().map(str::to_string).collect()
        };
        words(a).intersection(&words(b)).count()
    }

    /// Pattern-based split suggestions for one task (spec §4.1 "Split
    /// suggestion strategies"), capped at five.
    #[must_use]
    pub fn suggest_splits(&self, task: &Task, module: Option<&SystemModule>) -> Vec<SplitSuggestion> {
        let mut out = Vec::new();
        let desc_lower = task.description.to_lowercase();

        let has_conjunction = [" and ", " then ", " also ", " as well as "]
            .iter()
            .any(|c| desc_lower.contains(c));
        if has_conjunction {
            out.push(SplitSuggestion {
                task_id: task.id,
                strategy: SplitStrategy::ByFunction,
                parts: vec!["first half".to_string(), "second half".to_string()],
            });
        }

        if let Some(m) = module {
            match m.module_type {
                ModuleType::Frontend => out.push(SplitSuggestion {
                    task_id: task.id,
                    strategy: SplitStrategy::ByLayer,
                    parts: vec!["UI".to_string(), "logic".to_string()],
                }),
                ModuleType::Backend => out.push(SplitSuggestion {
                    task_id: task.id,
                    strategy: SplitStrategy::ByLayer,
                    parts: vec!["API".to_string(), "logic".to_string(), "data".to_string()],
                }),
                _ => {}
            }
        }

        let total_deps = task.depends_on.len() + module.map_or(0, |m| m.dependencies.len());
        if total_deps > 3 {
            out.push(SplitSuggestion {
                task_id: task.id,
                strategy: SplitStrategy::ByDependency,
                parts: vec!["integration".to_string(), "core".to_string()],
            });
        }

        if let Some(m) = module {
            if m.interfaces.len() > 2 {
                let parts = m
                    .interfaces
                    .iter()
                    .take(3)
                    .map(|i| i.with_module.clone())
                    .collect();
                out.push(SplitSuggestion {
                    task_id: task.id,
                    strategy: SplitStrategy::ByInterface,
                    parts,
                });
            }
        }

        out.truncate(5);
        out
    }

    /// Evaluate the sibling-group merge rule (spec §4.1 "Merge rule")
    /// over every parent's set of children (including the root set,
    /// whose shared "parent" is `None`). Never merges anything itself —
    /// only returns suggestions.
    #[must_use]
    pub fn suggest_merges(
        &self,
        tree: &TaskTree,
        modules: &HashMap<&str, &SystemModule>,
    ) -> Vec<MergeSuggestion> {
        let mut groups: HashMap<Option<Uuid>, Vec<&Task>> = HashMap::new();
        for task in tree.all() {
            groups.entry(task.parent_id).or_default().push(task);
        }

        let mut suggestions = Vec::new();
        for (parent_id, siblings) in &groups {
            if siblings.len() < 2 {
                continue;
            }

            let scored: Vec<(&Task, f64)> = siblings
                .iter()
                .map(|t| {
                    let module = modules.get(t.module_id.as_str()).copied();
                    let children = tree.children_of(t.id).len();
                    (*t, self.score(t, module, children).value)
                })
                .collect();

            // (a) >= 2 siblings below minComplexity.
            let below: Vec<&Task> = scored
                .iter()
                .filter(|(_, s)| *s < self.config.min_task_complexity)
                .map(|(t, _)| *t)
                .collect();
            if below.len() >= 2 {
                suggestions.push(MergeSuggestion {
                    parent_id: *parent_id,
                    task_ids: below.iter().map(|t| t.id).collect(),
                    reason: "two or more siblings score below the minimum complexity".to_string(),
                });
            }

            // (b) siblings exceed maxChildrenPerNode with average score < 30.
            if siblings.len() > self.config.max_children_per_node {
                let avg = scored.iter().map(|(_, s)| *s).sum::<f64>() / scored.len() as f64;
                if avg < 30.0 {
                    suggestions.push(MergeSuggestion {
                        parent_id: *parent_id,
                        task_ids: siblings.iter().map(|t| t.id).collect(),
                        reason: format!(
                            "{} siblings exceed max_children_per_node with average score {avg:.1}",
                            siblings.len()
                        ),
                    });
                }
            }

            // (c) a related pair (same module, >=2 shared title keywords,
            // or description overlap > 0.3) with average score < 1.5 * minComplexity.
            for i in 0..scored.len() {
                for j in (i + 1)..scored.len() {
                    let (a, score_a) = scored[i];
                    let (b, score_b) = scored[j];
                    let related = a.module_id == b.module_id
                        || Self::shared_title_keywords(a, b) >= 2
                        || Self::related_group_overlap(a, b) > 0.3;
                    if !related {
                        continue;
                    }
                    let avg = (score_a + score_b) / 2.0;
                    if avg < 1.5 * self.config.min_task_complexity {
                        suggestions.push(MergeSuggestion {
                            parent_id: *parent_id,
                            task_ids: vec![a.id, b.id],
                            reason: "related group with average score below threshold".to_string(),
                        });
                    }
                }
            }
        }
        suggestions
    }

    /// Structural diagnostics over the whole tree (spec §4.1 "Structural
    /// diagnostics"), produced after one full split pass.
    #[must_use]
    pub fn diagnostics(&self, tree: &TaskTree) -> Vec<TreeIssue> {
        let mut issues = Vec::new();

        for task in tree.all() {
            if task.depth > self.config.max_depth {
                issues.push(TreeIssue {
                    kind: TreeIssueKind::TooDeep,
                    severity: IssueSeverity::High,
                    task_id: Some(task.id),
                    detail: format!(
                        "depth {} exceeds max_depth {}",
                        task.depth, self.config.max_depth
                    ),
                });
            }

            let children = tree.children_of(task.id).len();
            if children > self.config.max_children_per_node {
                issues.push(TreeIssue {
                    kind: TreeIssueKind::TooManyChildren,
                    severity: IssueSeverity::High,
                    task_id: Some(task.id),
                    detail: format!(
                        "{children} children exceeds max_children_per_node {}",
                        self.config.max_children_per_node
                    ),
                });
            }
        }

        for leaf in tree.leaves() {
            if leaf.depth < self.config.min_depth {
                issues.push(TreeIssue {
                    kind: TreeIssueKind::TooShallow,
                    severity: IssueSeverity::Medium,
                    task_id: Some(leaf.id),
                    detail: format!(
                        "leaf at depth {} is shallower than min_depth {}",
                        leaf.depth, self.config.min_depth
                    ),
                });
            }
        }

        let leaf_depths: Vec<u32> = tree.leaves().iter().map(|t| t.depth).collect();
        if let (Some(min_d), Some(max_d)) = (leaf_depths.iter().min(), leaf_depths.iter().max()) {
            if max_d - min_d > 2 {
                issues.push(TreeIssue {
                    kind: TreeIssueKind::Unbalanced,
                    severity: IssueSeverity::Low,
                    task_id: None,
                    detail: format!("leaf depths range from {min_d} to {max_d}"),
                });
            }
        }

        issues
    }

    /// Run scoring, split suggestions, merge suggestions, and
    /// diagnostics over the whole tree in one pass (spec §4.1's
    /// `GranularityReport`).
    #[must_use]
    pub fn analyze(
        &self,
        tree: &TaskTree,
        modules: &HashMap<&str, &SystemModule>,
    ) -> GranularityReport {
        let mut scores = HashMap::new();
        let mut suggestions = Vec::new();

        for task in tree.all() {
            let module = modules.get(task.module_id.as_str()).copied();
            let children_count = tree.children_of(task.id).len();
            let score = self.score(task, module, children_count);
            scores.insert(task.id, score);

            if self.decide(task, module, children_count) == GranularityDecision::Split {
                suggestions.extend(self.suggest_splits(task, module));
            }
        }

        let merges = self.suggest_merges(tree, modules);
        let issues = self.diagnostics(tree);

        GranularityReport { scores, suggestions, merges, issues }
    }

    /// Dry-run: compute what a real pass would do to `tree` without
    /// mutating it (spec §6 `adjustGranularity`, used by the CLI's
    /// `adjust` subcommand and any UI dry-run).
    #[must_use]
    pub fn adjust_granularity(
        &self,
        tree: &TaskTree,
        modules: &HashMap<&str, &SystemModule>,
    ) -> AdjustmentResult {
        let report = self.analyze(tree, modules);
        let would_split = tree
            .leaves()
            .into_iter()
            .filter(|t| t.depth < self.config.max_depth)
            .filter(|t| {
                let module = modules.get(t.module_id.as_str()).copied();
                self.decide(t, module, tree.children_of(t.id).len()) == GranularityDecision::Split
            })
            .count();
        AdjustmentResult { report, would_split }
    }

    /// Walk every leaf in `tree` once, splitting any leaf the scorer
    /// recommends splitting into two subtasks (by-function: the
    /// description's sentences divided in half). Returns the number of
    /// splits performed. Leaves that become parents stop being
    /// dispatchable, matching `TaskTree::leaves`'s definition.
    ///
    /// Callers (the `run` CLI command) invoke this repeatedly until it
    /// returns 0 or `max_depth` is reached, per spec §2's "iterates
    /// until the tree satisfies shape constraints".
    ///
    /// # Errors
    /// Propagates [`crate::domain::errors::DomainError`] from inserting
    /// the new subtasks into the tree.
    pub fn apply_one_pass(
        &self,
        tree: &mut TaskTree,
        modules: &HashMap<&str, &SystemModule>,
    ) -> DomainResult<usize> {
        let candidates: Vec<Task> = tree
            .leaves()
            .into_iter()
            .filter(|t| t.depth < self.config.max_depth)
            .filter(|t| {
                let module = modules.get(t.module_id.as_str()).copied();
                self.decide(t, module, tree.children_of(t.id).len()) == GranularityDecision::Split
            })
            .cloned()
            .collect();

        let mut splits = 0;
        for task in candidates {
            let (first_half, second_half) = split_description(&task.description);
            let child_a = Task::new(
                task.blueprint_id,
                task.module_id.clone(),
                format!("{} (part 1)", task.title),
                first_half,
                Vec::new(),
                task.depth + 1,
            )
            .with_parent(task.id);
            let child_b = Task::new(
                task.blueprint_id,
                task.module_id.clone(),
                format!("{} (part 2)", task.title),
                second_half,
                Vec::new(),
                task.depth + 1,
            )
            .with_parent(task.id);
            tree.insert(child_a)?;
            tree.insert(child_b)?;
            splits += 1;
        }
        Ok(splits)
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Split a description roughly in half on a sentence boundary, falling
/// back to a word-count midpoint if there's only one sentence.
fn split_description(description: &str) -> (String, String) {
    let sentences: Vec<&str> = description.split_inclusive(['.', '!', '?']).collect();
    if sentences.len() > 1 {
        let mid = sentences.len().div_ceil(2);
        return (
            sentences[..mid].concat().trim().to_string(),
            sentences[mid..].concat().trim().to_string(),
        );
    }
    let words: Vec<&str> = description.split_whitespace().collect();
    let mid = words.len().div_ceil(2).max(1);
    (
        words[..mid.min(words.len())].join(" "),
        words[mid.min(words.len())..].join(" "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::blueprint::ModuleInterface;
    use uuid::Uuid;

    fn make_task(description: &str, depth: u32, acceptance_tests: usize) -> Task {
        let mut task = Task::new(Uuid::new_v4(), "core", "t", description, vec![], depth);
        task.acceptance_tests = (0..acceptance_tests).map(|i| format!("test {i}")).collect();
        task
    }

    fn no_modules() -> HashMap<&'static str, &'static SystemModule> {
        HashMap::new()
    }

    #[test]
    fn short_description_scores_low() {
        let controller = GranularityController::new(GranularityConfig::default());
        let task = make_task("fix typo", 0, 0);
        let score = controller.score(&task, None, 0);
        assert!(score.value < 40.0, "expected low complexity, got {}", score.value);
    }

    #[test]
    fn long_description_at_max_depth_is_acceptable_not_split() {
        let config = GranularityConfig {
            max_depth: 2,
            ..GranularityConfig::default()
        };
        let controller = GranularityController::new(config);
        let long_desc = "word ".repeat(500);
        let task = make_task(&long_desc, 2, 5);
        assert_eq!(controller.decide(&task, None, 0), GranularityDecision::Acceptable);
    }

    #[test]
    fn long_description_below_max_depth_recommends_split() {
        let controller = GranularityController::new(GranularityConfig::default());
        let long_desc = "word ".repeat(500);
        let task = make_task(&long_desc, 0, 5);
        assert_eq!(controller.decide(&task, None, 0), GranularityDecision::Split);
    }

    #[test]
    fn too_many_children_triggers_split_even_with_moderate_score() {
        let config = GranularityConfig {
            max_children_per_node: 2,
            ..GranularityConfig::default()
        };
        let controller = GranularityController::new(config);
        let task = make_task("moderate description with a few words in it", 0, 1);
        assert_eq!(controller.decide(&task, None, 3), GranularityDecision::Split);
    }

    #[test]
    fn long_duration_triggers_split() {
        let config = GranularityConfig {
            max_task_duration: 1.0,
            ..GranularityConfig::default()
        };
        let controller = GranularityController::new(config);
        let task = make_task("implement a reasonably sized feature", 0, 0);
        assert_eq!(controller.decide(&task, None, 0), GranularityDecision::Split);
    }

    #[test]
    fn shallow_complex_leaf_triggers_split() {
        let config = GranularityConfig {
            min_depth: 3,
            ..GranularityConfig::default()
        };
        let controller = GranularityController::new(config);
        let long_desc = "word ".repeat(400);
        let task = make_task(&long_desc, 0, 5);
        assert_eq!(controller.decide(&task, None, 0), GranularityDecision::Split);
    }

    #[test]
    fn overlap_is_one_for_identical_descriptions() {
        let a = make_task("implement the login form", 1, 0);
        let b = make_task("implement the login form", 1, 0);
        assert!((GranularityController::related_group_overlap(&a, &b) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn overlap_is_zero_for_disjoint_descriptions() {
        let a = make_task("implement the login form", 1, 0);
        let b = make_task("write database migration scripts", 1, 0);
        assert_eq!(GranularityController::related_group_overlap(&a, &b), 0.0);
    }

    #[test]
    fn apply_one_pass_splits_an_oversized_leaf_into_two_children() {
        let controller = GranularityController::new(GranularityConfig::default());
        let long_desc = "word ".repeat(500);
        let task = make_task(&long_desc, 0, 5);
        let task_id = task.id;
        let mut tree = TaskTree::from_nodes(vec![task]).unwrap();

        let splits = controller.apply_one_pass(&mut tree, &no_modules()).unwrap();
        assert_eq!(splits, 1);
        assert_eq!(tree.children_of(task_id).len(), 2);
        assert!(tree.leaves().iter().all(|t| t.parent_id.is_some()));
    }

    #[test]
    fn two_low_complexity_siblings_are_suggested_for_merge() {
        let controller = GranularityController::new(GranularityConfig::default());
        let a = make_task("fix typo in label", 1, 0);
        let b = make_task("fix typo in tooltip", 1, 0);
        let tree = TaskTree::from_nodes(vec![a, b]).unwrap();

        let merges = controller.suggest_merges(&tree, &no_modules());
        assert!(merges.iter().any(|m| m.task_ids.len() == 2));
    }

    #[test]
    fn suggest_splits_detects_conjunction_and_dependency_patterns() {
        let controller = GranularityController::new(GranularityConfig::default());
        let mut task = make_task("build the login form and wire it to the session api", 0, 0);
        task.depends_on = vec![Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let suggestions = controller.suggest_splits(&task, None);
        assert!(suggestions.iter().any(|s| s.strategy == SplitStrategy::ByFunction));
        assert!(suggestions.iter().any(|s| s.strategy == SplitStrategy::ByDependency));
    }

    #[test]
    fn suggest_splits_respects_module_interface_count() {
        let controller = GranularityController::new(GranularityConfig::default());
        let task = make_task("wire up the connectors", 0, 0);
        let module = SystemModule {
            id: "core".to_string(),
            name: "Core".to_string(),
            description: "core module".to_string(),
            module_type: ModuleType::Backend,
            dependencies: vec![],
            interfaces: (0..4)
                .map(|i| ModuleInterface {
                    with_module: format!("m{i}"),
                    description: "seam".to_string(),
                })
                .collect(),
        };
        let suggestions = controller.suggest_splits(&task, Some(&module));
        assert!(suggestions.iter().any(|s| s.strategy == SplitStrategy::ByInterface));
        assert!(suggestions.iter().any(|s| s.strategy == SplitStrategy::ByLayer));
    }

    #[test]
    fn diagnostics_flags_too_deep_and_unbalanced() {
        let config = GranularityConfig {
            max_depth: 2,
            ..GranularityConfig::default()
        };
        let controller = GranularityController::new(config);
        let root = make_task("root", 0, 0);
        let bp_id = root.blueprint_id;
        let root_id = root.id;
        let a = Task::new(bp_id, "core", "a", "layer a", vec![], 1).with_parent(root_id);
        let a_id = a.id;
        let b = Task::new(bp_id, "core", "b", "layer b", vec![], 2).with_parent(a_id);
        let b_id = b.id;
        let c = Task::new(bp_id, "core", "c", "layer c", vec![], 3).with_parent(b_id);
        let shallow_sibling = make_task("shallow sibling", 0, 0);
        let tree = TaskTree::from_nodes(vec![root, a, b, c, shallow_sibling]).unwrap();

        let issues = controller.diagnostics(&tree);
        assert!(issues.iter().any(|i| i.kind == TreeIssueKind::TooDeep));
        assert!(issues.iter().any(|i| i.kind == TreeIssueKind::Unbalanced));
    }
}
