use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::task::error::TaskError;
use crate::task::graph::DependencyGraph;
use crate::task::strategy::*;
use crate::task::types::*;

/// Selector configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub strategy: SelectionStrategy,
    /// Let tasks that already have subtasks compete for selection
    pub allow_parent_with_subtasks: bool,
    /// Finish started work before picking up pending tasks
    pub prefer_in_progress: bool,
    /// How many runner-up candidates to report
    pub max_alternatives: usize,
    pub weights: ScoringWeights,
}

/// Task selection result
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectionResult {
    pub task: Task,
    pub strategy: SelectionStrategy,
    pub reason: String,
    pub score: ScoreBreakdown,
    /// Next-best candidates, best first
    pub alternatives: Vec<ScoredTask>,
    /// The winner was already in progress
    pub resumed: bool,
    pub duration: Duration,
}

/// Picks the next task to work on from a project snapshot
#[derive(Clone, Debug, Default)]
pub struct TaskSelector {
    config: SelectionConfig,
}

impl TaskSelector {
    /// Create a new task selector
    pub fn new(config: SelectionConfig) -> Self {
        Self { config }
    }

    /// Same selector with a different strategy
    pub fn with_strategy(mut self, strategy: SelectionStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    /// Select the next task to work on
    pub fn select_next_actionable_task(
        &self,
        tasks: &[Task],
    ) -> Result<SelectionResult, TaskError> {
        let started = Instant::now();
        let graph = DependencyGraph::new(tasks);

        let pending: Vec<&Task> = graph
            .tasks()
            .filter(|t| t.state == TaskState::Pending)
            .collect();
        let in_progress: Vec<&Task> = graph
            .tasks()
            .filter(|t| t.state == TaskState::InProgress)
            .collect();

        if pending.is_empty() && in_progress.is_empty() {
            debug!("No pending or in-progress tasks in snapshot");
            return Err(TaskError::NoTasks);
        }

        let pool: Vec<&Task> = if self.config.prefer_in_progress {
            let started_work: Vec<&Task> = in_progress
                .iter()
                .copied()
                .filter(|t| self.passes_hierarchy_filter(t, &graph))
                .collect();

            if !started_work.is_empty() {
                let eligible: Vec<&Task> = started_work
                    .iter()
                    .copied()
                    .filter(|t| graph.dependencies_met(t))
                    .collect();
                if eligible.is_empty() {
                    return Err(TaskError::DataInconsistency {
                        in_progress: started_work.iter().map(|t| t.id).collect(),
                    });
                }
                return self.pick(&graph, eligible, started);
            }
            pending.clone()
        } else {
            pending.iter().chain(in_progress.iter()).copied().collect()
        };

        let eligible: Vec<&Task> = pool
            .iter()
            .copied()
            .filter(|t| self.is_eligible(t, &graph))
            .collect();

        if eligible.is_empty() {
            return Err(self.diagnose(&graph, &pool));
        }

        self.pick(&graph, eligible, started)
    }

    /// Score every eligible candidate and keep the best
    fn pick(
        &self,
        graph: &DependencyGraph<'_>,
        eligible: Vec<&Task>,
        started: Instant,
    ) -> Result<SelectionResult, TaskError> {
        let scorer = self.config.strategy.scorer();
        let ctx = ScoringContext {
            graph,
            weights: &self.config.weights,
        };

        let mut scored: Vec<(&Task, ScoreBreakdown)> = eligible
            .into_iter()
            .map(|task| {
                let score = scorer.score(task, &ctx);
                debug!(
                    "Scored task {} ({}) at {:.2} under {}",
                    task.id,
                    task.title,
                    score.raw_score,
                    scorer.strategy()
                );
                (task, score)
            })
            .collect();
        scored.sort_by(|a, b| scorer.compare((a.0, &a.1), (b.0, &b.1)));

        let mut ranked = scored.into_iter();
        let Some((winner, score)) = ranked.next() else {
            return Err(TaskError::NoActionable {
                reason: "no eligible candidates".to_string(),
            });
        };

        let alternatives = ranked
            .take(self.config.max_alternatives)
            .map(|(task, score)| ScoredTask {
                task_id: task.id,
                title: task.title.clone(),
                score,
            })
            .collect();

        let resumed = winner.state == TaskState::InProgress;
        let reason = self.build_selection_reason(winner, &score, resumed);
        let result = SelectionResult {
            task: winner.clone(),
            strategy: self.config.strategy,
            reason,
            score,
            alternatives,
            resumed,
            duration: started.elapsed(),
        };

        info!(
            "Selected task {} with score {:.2}: {}",
            result.task.id, result.score.raw_score, result.reason
        );
        Ok(result)
    }

    fn passes_hierarchy_filter(&self, task: &Task, graph: &DependencyGraph<'_>) -> bool {
        self.config.allow_parent_with_subtasks || !graph.has_children(task.id)
    }

    /// Check if a task may be selected
    fn is_eligible(&self, task: &Task, graph: &DependencyGraph<'_>) -> bool {
        task.is_open() && self.passes_hierarchy_filter(task, graph) && graph.dependencies_met(task)
    }

    /// Explain why nothing in the pool could be selected
    fn diagnose(&self, graph: &DependencyGraph<'_>, pool: &[&Task]) -> TaskError {
        let blocked: Vec<&Task> = pool
            .iter()
            .copied()
            .filter(|t| self.passes_hierarchy_filter(t, graph) && !graph.dependencies_met(t))
            .collect();

        if pool.is_empty() {
            return TaskError::NoActionable {
                reason: "only in-progress parent tasks remain and none of their subtasks is open"
                    .to_string(),
            };
        }
        if blocked.is_empty() {
            return TaskError::NoActionable {
                reason: format!(
                    "{} candidate task(s) all have subtasks; work on the subtasks instead",
                    pool.len()
                ),
            };
        }

        // Cycle detection first: it gives the more specific diagnosis
        let roots: Vec<TaskId> = blocked.iter().map(|t| t.id).collect();
        let cycles = graph.detect_unmet_cycles_within(&roots);
        if !cycles.is_empty() {
            return TaskError::CircularDependency { cycles };
        }

        for task in &blocked {
            if let Some(missing) = task.dependencies.iter().find(|d| !graph.contains(**d)) {
                return TaskError::DanglingDependency {
                    task_id: task.id,
                    missing: *missing,
                };
            }
        }

        TaskError::Deadlock { blocked: roots }
    }

    /// Build a human-readable explanation for task selection
    fn build_selection_reason(
        &self,
        task: &Task,
        score: &ScoreBreakdown,
        resumed: bool,
    ) -> String {
        let mut reasons = Vec::new();

        if resumed {
            reasons.push("resuming in-progress work".to_string());
        }

        match self.config.strategy {
            SelectionStrategy::DependencyAware => {
                if score.unblocked_count > 0 {
                    reasons.push(format!("unblocks {} task(s)", score.unblocked_count));
                }
                if score.dependent_count > 0 {
                    reasons.push(format!("{} direct dependent(s)", score.dependent_count));
                }
            }
            SelectionStrategy::DepthFirst => {
                reasons.push(format!("depth {}", score.depth));
            }
            SelectionStrategy::Priority => {}
            SelectionStrategy::CreationOrder => {
                reasons.push(format!(
                    "oldest actionable task (created {})",
                    task.created_at.to_rfc3339()
                ));
            }
            SelectionStrategy::CriticalPath => {
                reasons.push(format!(
                    "heads a chain of {} open dependent(s)",
                    score.critical_path_length
                ));
            }
        }

        reasons.push(format!("priority {}", task.priority));

        format!("{}: {}", self.config.strategy, reasons.join(", "))
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            strategy: SelectionStrategy::default(),
            allow_parent_with_subtasks: false,
            prefer_in_progress: true,
            max_alternatives: 3,
            weights: ScoringWeights::default(),
        }
    }
}

/// Select the next task from a snapshot with the given configuration
pub fn select_next_actionable_task(
    tasks: &[Task],
    config: &SelectionConfig,
) -> Result<SelectionResult, TaskError> {
    TaskSelector::new(config.clone()).select_next_actionable_task(tasks)
}
