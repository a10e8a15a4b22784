//! Scoring policies for ranking selection candidates.
//!
//! Every policy produces a [`ScoreBreakdown`] per candidate and orders candidates by raw
//! score descending, then by its own tie-break chain, which always ends with earliest
//! creation time and finally task id. Two distinct tasks therefore never compare equal.
//! Dependency-aware ranking skips the raw score and orders by its chain alone.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

use crate::task::error::TaskError;
use crate::task::graph::{DependencyGraph, ProjectStatistics};
use crate::task::types::*;

/// Available scoring policies
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionStrategy {
    #[default]
    DependencyAware,
    DepthFirst,
    Priority,
    CreationOrder,
    CriticalPath,
}

/// Weights applied when a policy folds several factors into one raw score
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub unblock_weight: f64,
    pub dependent_weight: f64,
    pub priority_weight: f64,
    pub depth_weight: f64,
    pub critical_path_weight: f64,
}

/// Per-candidate scoring details
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Open tasks whose last unmet dependency is this candidate
    pub unblocked_count: usize,
    /// Tasks directly depending on this candidate
    pub dependent_count: usize,
    pub depth: u32,
    pub priority: u8,
    /// Longest chain of unfinished dependents hanging off this candidate
    pub critical_path_length: usize,
    pub raw_score: f64,
}

/// Everything a scorer may look at besides the candidate itself
pub struct ScoringContext<'g, 'a> {
    pub graph: &'g DependencyGraph<'a>,
    pub weights: &'g ScoringWeights,
}

/// A candidate with its computed score
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredTask {
    pub task_id: TaskId,
    pub title: String,
    pub score: ScoreBreakdown,
}

/// Scoring policy seam
pub trait TaskScorer {
    fn strategy(&self) -> SelectionStrategy;

    /// Compute the score breakdown for one candidate
    fn score(&self, candidate: &Task, ctx: &ScoringContext<'_, '_>) -> ScoreBreakdown;

    /// Policy-specific ordering for equal raw scores; `Less` means `a` ranks first
    fn tie_break(&self, a: (&Task, &ScoreBreakdown), b: (&Task, &ScoreBreakdown)) -> Ordering;

    /// Total order over candidates, best first
    fn compare(&self, a: (&Task, &ScoreBreakdown), b: (&Task, &ScoreBreakdown)) -> Ordering {
        b.1.raw_score
            .total_cmp(&a.1.raw_score)
            .then_with(|| self.tie_break(a, b))
            .then_with(|| by_creation(a.0, b.0))
    }
}

/// Rewards finishing work that other tasks are waiting on
pub struct DependencyAwareScorer;
/// Rewards finishing deep branches before their siblings
pub struct DepthFirstScorer;
pub struct PriorityScorer;
pub struct CreationOrderScorer;
/// Rewards the start of the longest remaining dependent chain
pub struct CriticalPathScorer;

impl TaskScorer for DependencyAwareScorer {
    fn strategy(&self) -> SelectionStrategy {
        SelectionStrategy::DependencyAware
    }

    fn score(&self, candidate: &Task, ctx: &ScoringContext<'_, '_>) -> ScoreBreakdown {
        let mut breakdown = base_breakdown(candidate, ctx);
        breakdown.raw_score = breakdown.unblocked_count as f64 * ctx.weights.unblock_weight
            + breakdown.dependent_count as f64 * ctx.weights.dependent_weight
            + breakdown.priority as f64 * ctx.weights.priority_weight;
        breakdown
    }

    fn tie_break(&self, a: (&Task, &ScoreBreakdown), b: (&Task, &ScoreBreakdown)) -> Ordering {
        b.1.unblocked_count
            .cmp(&a.1.unblocked_count)
            .then_with(|| b.1.dependent_count.cmp(&a.1.dependent_count))
            .then_with(|| b.1.priority.cmp(&a.1.priority))
    }

    /// Strictly by unblocked, then dependents, then priority; the weighted raw score is
    /// only reported
    fn compare(&self, a: (&Task, &ScoreBreakdown), b: (&Task, &ScoreBreakdown)) -> Ordering {
        self.tie_break(a, b).then_with(|| by_creation(a.0, b.0))
    }
}

impl TaskScorer for DepthFirstScorer {
    fn strategy(&self) -> SelectionStrategy {
        SelectionStrategy::DepthFirst
    }

    fn score(&self, candidate: &Task, ctx: &ScoringContext<'_, '_>) -> ScoreBreakdown {
        let mut breakdown = base_breakdown(candidate, ctx);
        breakdown.raw_score = breakdown.depth as f64 * ctx.weights.depth_weight;
        breakdown
    }

    fn tie_break(&self, a: (&Task, &ScoreBreakdown), b: (&Task, &ScoreBreakdown)) -> Ordering {
        b.1.priority.cmp(&a.1.priority)
    }
}

impl TaskScorer for PriorityScorer {
    fn strategy(&self) -> SelectionStrategy {
        SelectionStrategy::Priority
    }

    fn score(&self, candidate: &Task, ctx: &ScoringContext<'_, '_>) -> ScoreBreakdown {
        let mut breakdown = base_breakdown(candidate, ctx);
        breakdown.raw_score = breakdown.priority as f64 * ctx.weights.priority_weight;
        breakdown
    }

    fn tie_break(&self, _a: (&Task, &ScoreBreakdown), _b: (&Task, &ScoreBreakdown)) -> Ordering {
        Ordering::Equal
    }
}

impl TaskScorer for CreationOrderScorer {
    fn strategy(&self) -> SelectionStrategy {
        SelectionStrategy::CreationOrder
    }

    fn score(&self, candidate: &Task, ctx: &ScoringContext<'_, '_>) -> ScoreBreakdown {
        let mut breakdown = base_breakdown(candidate, ctx);
        breakdown.raw_score = -(candidate.created_at.timestamp_millis() as f64);
        breakdown
    }

    fn tie_break(&self, _a: (&Task, &ScoreBreakdown), _b: (&Task, &ScoreBreakdown)) -> Ordering {
        Ordering::Equal
    }
}

impl TaskScorer for CriticalPathScorer {
    fn strategy(&self) -> SelectionStrategy {
        SelectionStrategy::CriticalPath
    }

    fn score(&self, candidate: &Task, ctx: &ScoringContext<'_, '_>) -> ScoreBreakdown {
        let mut breakdown = base_breakdown(candidate, ctx);
        breakdown.raw_score =
            breakdown.critical_path_length as f64 * ctx.weights.critical_path_weight;
        breakdown
    }

    fn tie_break(&self, a: (&Task, &ScoreBreakdown), b: (&Task, &ScoreBreakdown)) -> Ordering {
        b.1.dependent_count
            .cmp(&a.1.dependent_count)
            .then_with(|| b.1.priority.cmp(&a.1.priority))
    }
}

fn base_breakdown(candidate: &Task, ctx: &ScoringContext<'_, '_>) -> ScoreBreakdown {
    let graph = ctx.graph;
    let dependents = graph.dependents(candidate.id);

    let unblocked_count = dependents
        .iter()
        .filter_map(|id| graph.get(*id))
        .filter(|dependent| !dependent.is_finished())
        .filter(|dependent| {
            let unmet = graph.unmet_dependencies(dependent);
            unmet.len() == 1 && unmet[0] == candidate.id
        })
        .count();

    ScoreBreakdown {
        unblocked_count,
        dependent_count: dependents.len(),
        depth: candidate.depth,
        priority: candidate.priority_value(),
        critical_path_length: graph.longest_dependent_chain(candidate.id),
        raw_score: 0.0,
    }
}

// Final links of every chain: earliest creation, then lowest id
fn by_creation(a: &Task, b: &Task) -> Ordering {
    a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id))
}

impl SelectionStrategy {
    pub const ALL: [SelectionStrategy; 5] = [
        SelectionStrategy::DependencyAware,
        SelectionStrategy::DepthFirst,
        SelectionStrategy::Priority,
        SelectionStrategy::CreationOrder,
        SelectionStrategy::CriticalPath,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionStrategy::DependencyAware => "dependency-aware",
            SelectionStrategy::DepthFirst => "depth-first",
            SelectionStrategy::Priority => "priority",
            SelectionStrategy::CreationOrder => "creation-order",
            SelectionStrategy::CriticalPath => "critical-path",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SelectionStrategy::DependencyAware => {
                "work that unblocks the most other tasks first"
            }
            SelectionStrategy::DepthFirst => "finish deep branches before their siblings",
            SelectionStrategy::Priority => "highest priority first",
            SelectionStrategy::CreationOrder => "oldest task first",
            SelectionStrategy::CriticalPath => "start of the longest remaining chain first",
        }
    }

    /// Scorer implementing this policy
    pub fn scorer(&self) -> Box<dyn TaskScorer> {
        match self {
            SelectionStrategy::DependencyAware => Box::new(DependencyAwareScorer),
            SelectionStrategy::DepthFirst => Box::new(DepthFirstScorer),
            SelectionStrategy::Priority => Box::new(PriorityScorer),
            SelectionStrategy::CreationOrder => Box::new(CreationOrderScorer),
            SelectionStrategy::CriticalPath => Box::new(CriticalPathScorer),
        }
    }
}

impl fmt::Display for SelectionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strategy name that matches none of the known policies
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown selection strategy '{0}' (expected one of: dependency-aware, depth-first, priority, creation-order, critical-path)")]
pub struct UnknownStrategy(pub String);

impl FromStr for SelectionStrategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        SelectionStrategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == normalized)
            .ok_or_else(|| UnknownStrategy(s.to_string()))
    }
}

/// Outcome of looking up a caller-supplied strategy preference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyPreference {
    /// Nothing was supplied
    Unspecified,
    Recognized(SelectionStrategy),
    /// Something was supplied but matches no policy
    Unrecognized(String),
}

/// Look up an optional strategy name without silently substituting a default
pub fn resolve_strategy(input: Option<&str>) -> StrategyPreference {
    match input.map(str::trim) {
        None | Some("") => StrategyPreference::Unspecified,
        Some(name) => match name.parse() {
            Ok(strategy) => StrategyPreference::Recognized(strategy),
            Err(UnknownStrategy(raw)) => StrategyPreference::Unrecognized(raw),
        },
    }
}

impl StrategyPreference {
    /// Pick the preferred strategy or fall back, warning when a name was not recognized
    pub fn or_fallback(self, fallback: SelectionStrategy) -> SelectionStrategy {
        match self {
            StrategyPreference::Recognized(strategy) => strategy,
            StrategyPreference::Unspecified => fallback,
            StrategyPreference::Unrecognized(raw) => {
                warn!(
                    "Unknown selection strategy '{}', using '{}' instead",
                    raw, fallback
                );
                fallback
            }
        }
    }
}

/// Strategy suggestion for a project with the figures behind it
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StrategyRecommendation {
    pub strategy: SelectionStrategy,
    pub reason: String,
    pub statistics: Option<ProjectStatistics>,
}

/// Suggest a strategy for a project snapshot; never fails
pub fn recommend_strategy(tasks: &[Task]) -> StrategyRecommendation {
    match analyze_project(tasks) {
        Ok(recommendation) => recommendation,
        Err(e) => {
            debug!("Project analysis failed, defaulting strategy: {}", e);
            StrategyRecommendation {
                strategy: SelectionStrategy::DependencyAware,
                reason: format!("analysis unavailable ({}); dependency-aware is the safe default", e),
                statistics: None,
            }
        }
    }
}

/// Classify a project by size, dependency density and depth distribution
pub fn analyze_project(tasks: &[Task]) -> Result<StrategyRecommendation, TaskError> {
    let graph = DependencyGraph::new(tasks);
    let statistics = graph.statistics();

    let open: Vec<&Task> = graph.tasks().filter(|t| !t.is_finished()).collect();
    if open.is_empty() {
        return Err(TaskError::NoTasks);
    }

    let open_edges = open
        .iter()
        .map(|t| t.dependencies.iter().filter(|d| graph.contains(**d)).count())
        .sum::<usize>();
    let subtasks = open.iter().filter(|t| t.depth > 0).count();
    let max_depth = open.iter().map(|t| t.depth).max().unwrap_or(0);

    let (strategy, reason) = if open_edges > 0 {
        (
            SelectionStrategy::DependencyAware,
            format!(
                "{} dependency edge(s) across {} open task(s) (density {:.2})",
                open_edges,
                open.len(),
                open_edges as f64 / open.len() as f64
            ),
        )
    } else if max_depth >= 2 || (subtasks > 0 && subtasks * 2 >= open.len()) {
        (
            SelectionStrategy::DepthFirst,
            format!(
                "no dependencies, hierarchy reaches depth {} with {} of {} open task(s) nested",
                max_depth,
                subtasks,
                open.len()
            ),
        )
    } else {
        (
            SelectionStrategy::CreationOrder,
            format!(
                "{} open task(s) with no dependencies and a flat hierarchy",
                open.len()
            ),
        )
    };

    Ok(StrategyRecommendation {
        strategy,
        reason,
        statistics: Some(statistics),
    })
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            unblock_weight: 100.0,
            dependent_weight: 10.0,
            priority_weight: 1.0,
            depth_weight: 1.0,
            critical_path_weight: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn id(name: &str) -> TaskId {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
    }

    fn task(name: &str, deps: &[&str]) -> Task {
        let mut task = Task::new(id("project"), TaskSpec::new(name, ""));
        task.id = id(name);
        task.dependencies = deps.iter().map(|d| id(d)).collect();
        task.created_at = Utc::now() - Duration::hours(1);
        task
    }

    fn rank(strategy: SelectionStrategy, tasks: &[Task], candidates: &[&str]) -> Vec<TaskId> {
        let graph = DependencyGraph::new(tasks);
        let weights = ScoringWeights::default();
        let ctx = ScoringContext {
            graph: &graph,
            weights: &weights,
        };
        let scorer = strategy.scorer();
        let mut scored: Vec<(&Task, ScoreBreakdown)> = candidates
            .iter()
            .map(|name| {
                let t = graph.get(id(name)).unwrap();
                (t, scorer.score(t, &ctx))
            })
            .collect();
        scored.sort_by(|a, b| scorer.compare((a.0, &a.1), (b.0, &b.1)));
        scored.into_iter().map(|(t, _)| t.id).collect()
    }

    #[test]
    fn test_strategy_names_round_trip() {
        for strategy in SelectionStrategy::ALL {
            assert_eq!(strategy.to_string().parse::<SelectionStrategy>(), Ok(strategy));
        }
        assert_eq!(
            "Depth_First".parse::<SelectionStrategy>(),
            Ok(SelectionStrategy::DepthFirst)
        );
        assert!("fastest".parse::<SelectionStrategy>().is_err());
    }

    #[test]
    fn test_resolve_strategy_distinguishes_missing_from_unknown() {
        assert_eq!(resolve_strategy(None), StrategyPreference::Unspecified);
        assert_eq!(resolve_strategy(Some("  ")), StrategyPreference::Unspecified);
        assert_eq!(
            resolve_strategy(Some("PRIORITY")),
            StrategyPreference::Recognized(SelectionStrategy::Priority)
        );
        assert_eq!(
            resolve_strategy(Some("random")),
            StrategyPreference::Unrecognized("random".to_string())
        );
        assert_eq!(
            resolve_strategy(Some("random")).or_fallback(SelectionStrategy::CriticalPath),
            SelectionStrategy::CriticalPath
        );
    }

    #[test]
    fn test_dependency_aware_prefers_unblocking_work() {
        let mut low = task("unblocker", &[]);
        low.priority = TaskPriority::Low;
        let mut high = task("loner", &[]);
        high.priority = TaskPriority::Critical;
        let tasks = vec![low, high, task("waiting", &["unblocker"])];

        let order = rank(
            SelectionStrategy::DependencyAware,
            &tasks,
            &["loner", "unblocker"],
        );
        assert_eq!(order[0], id("unblocker"));
    }

    #[test]
    fn test_dependency_aware_unblocking_outranks_many_dependents() {
        let mut tasks = vec![
            task("frees-one", &[]),
            task("waiting", &["frees-one"]),
            task("popular", &[]),
            task("partner", &[]),
        ];
        let names: Vec<String> = (0..12).map(|i| format!("needs-both-{}", i)).collect();
        for name in &names {
            tasks.push(task(name, &["popular", "partner"]));
        }

        let graph = DependencyGraph::new(&tasks);
        let weights = ScoringWeights::default();
        let ctx = ScoringContext {
            graph: &graph,
            weights: &weights,
        };
        let popular = DependencyAwareScorer.score(graph.get(id("popular")).unwrap(), &ctx);
        let frees_one = DependencyAwareScorer.score(graph.get(id("frees-one")).unwrap(), &ctx);
        assert_eq!(popular.unblocked_count, 0);
        assert_eq!(popular.dependent_count, 12);
        assert_eq!(frees_one.unblocked_count, 1);
        assert!(popular.raw_score > frees_one.raw_score);

        let order = rank(
            SelectionStrategy::DependencyAware,
            &tasks,
            &["popular", "partner", "frees-one"],
        );
        assert_eq!(order[0], id("frees-one"));
    }

    #[test]
    fn test_unblocked_count_requires_last_unmet_dependency() {
        let tasks = vec![
            task("a", &[]),
            task("b", &[]),
            task("needs-both", &["a", "b"]),
            task("needs-a", &["a"]),
        ];
        let graph = DependencyGraph::new(&tasks);
        let weights = ScoringWeights::default();
        let ctx = ScoringContext {
            graph: &graph,
            weights: &weights,
        };
        let score = DependencyAwareScorer.score(graph.get(id("a")).unwrap(), &ctx);
        assert_eq!(score.dependent_count, 2);
        assert_eq!(score.unblocked_count, 1);
    }

    #[test]
    fn test_depth_first_prefers_deeper_tasks() {
        let root = task("root", &[]);
        let mid = task("mid", &[]).with_parent(&root);
        let leaf = task("leaf", &[]).with_parent(&mid);
        let tasks = vec![task("other", &[]), root, mid, leaf];

        let order = rank(SelectionStrategy::DepthFirst, &tasks, &["other", "leaf", "mid"]);
        assert_eq!(order, vec![id("leaf"), id("mid"), id("other")]);
    }

    #[test]
    fn test_priority_ties_break_by_creation() {
        let mut older = task("older", &[]);
        older.priority = TaskPriority::High;
        older.created_at = Utc::now() - Duration::hours(5);
        let mut newer = task("newer", &[]);
        newer.priority = TaskPriority::High;
        let mut top = task("top", &[]);
        top.priority = TaskPriority::Critical;
        let tasks = vec![newer, older, top];

        let order = rank(SelectionStrategy::Priority, &tasks, &["newer", "older", "top"]);
        assert_eq!(order, vec![id("top"), id("older"), id("newer")]);
    }

    #[test]
    fn test_identical_tasks_break_by_id() {
        let now = Utc::now();
        let mut a = task("a", &[]);
        let mut b = task("b", &[]);
        a.created_at = now;
        b.created_at = now;
        let expected = if a.id < b.id { a.id } else { b.id };
        let tasks = vec![a, b];

        for strategy in SelectionStrategy::ALL {
            assert_eq!(rank(strategy, &tasks, &["a", "b"])[0], expected);
            assert_eq!(rank(strategy, &tasks, &["b", "a"])[0], expected);
        }
    }

    #[test]
    fn test_critical_path_prefers_longest_chain() {
        let tasks = vec![
            task("short", &[]),
            task("short-1", &["short"]),
            task("long", &[]),
            task("long-1", &["long"]),
            task("long-2", &["long-1"]),
            task("long-3", &["long-2"]),
        ];
        let order = rank(SelectionStrategy::CriticalPath, &tasks, &["short", "long"]);
        assert_eq!(order[0], id("long"));
    }

    #[test]
    fn test_recommendation_rules() {
        let flat = vec![task("a", &[]), task("b", &[])];
        assert_eq!(
            recommend_strategy(&flat).strategy,
            SelectionStrategy::CreationOrder
        );

        let linked = vec![task("a", &[]), task("b", &["a"])];
        let rec = recommend_strategy(&linked);
        assert_eq!(rec.strategy, SelectionStrategy::DependencyAware);
        assert!(rec.statistics.is_some());

        let root = task("root", &[]);
        let mid = task("mid", &[]).with_parent(&root);
        let leaf = task("leaf", &[]).with_parent(&mid);
        let deep = vec![root, mid, leaf];
        assert_eq!(recommend_strategy(&deep).strategy, SelectionStrategy::DepthFirst);
    }

    #[test]
    fn test_recommendation_falls_back_without_open_tasks() {
        let rec = recommend_strategy(&[]);
        assert_eq!(rec.strategy, SelectionStrategy::DependencyAware);
        assert!(!rec.reason.is_empty());
        assert!(rec.statistics.is_none());
        assert!(analyze_project(&[]).is_err());
    }
}
