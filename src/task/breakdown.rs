//! Complexity heuristics for task decomposition.

use serde::{Deserialize, Serialize};

use crate::task::error::TaskError;
use crate::task::graph::DependencyGraph;
use crate::task::types::*;

/// Limits and thresholds for decomposing tasks into subtasks
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakdownConfig {
    /// Tasks at or above this complexity should be split
    pub complexity_threshold: u8,
    pub max_depth: u32,
    /// Upper bound on siblings under one parent
    pub max_tasks_per_depth: usize,
    pub max_description_length: usize,
    /// Lower a parent's complexity as children are added
    pub auto_reduce: bool,
}

/// Complexity change applied to a parent after a child was added
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityReduction {
    pub parent_id: TaskId,
    pub previous: u8,
    pub reduced: u8,
    pub child_count: usize,
}

impl Default for BreakdownConfig {
    fn default() -> Self {
        Self {
            complexity_threshold: 8,
            max_depth: 5,
            max_tasks_per_depth: 20,
            max_description_length: 2000,
            auto_reduce: true,
        }
    }
}

/// Tasks complex enough to split that have not been split yet
pub fn find_tasks_needing_breakdown(tasks: &[Task], config: &BreakdownConfig) -> Vec<Task> {
    let graph = DependencyGraph::new(tasks);
    graph
        .tasks()
        .filter(|t| t.complexity >= config.complexity_threshold && !graph.has_children(t.id))
        .cloned()
        .collect()
}

/// Parent complexity once it has `child_count` children; never raises the current value
pub fn reduced_complexity(current: u8, child_count: usize) -> u8 {
    let target = match child_count {
        0 => current,
        1 => current.saturating_sub(2),
        2..=3 => 4,
        4..=5 => 3,
        _ => 2,
    };
    target.min(current).max(MIN_COMPLEXITY)
}

/// Compute the reduction for a parent that now has `child_count` children.
///
/// The threshold only gates the first child. Once a parent has been split, every further
/// child moves it along the schedule. Returns `None` when auto-reduce is off, a first
/// child arrives below the threshold, or the complexity would not change.
pub fn auto_reduce_parent_complexity(
    parent: &Task,
    child_count: usize,
    config: &BreakdownConfig,
) -> Option<ComplexityReduction> {
    if !config.auto_reduce || child_count == 0 {
        return None;
    }
    if child_count == 1 && parent.complexity < config.complexity_threshold {
        return None;
    }

    let reduced = reduced_complexity(parent.complexity, child_count);
    (reduced != parent.complexity).then(|| ComplexityReduction {
        parent_id: parent.id,
        previous: parent.complexity,
        reduced,
        child_count,
    })
}

/// Check depth, sibling count and description length before adding a child
pub fn check_child_limits(
    parent: &Task,
    sibling_count: usize,
    description: &str,
    config: &BreakdownConfig,
) -> Result<(), TaskError> {
    let depth = parent.depth + 1;
    if depth > config.max_depth {
        return Err(TaskError::BreakdownLimitExceeded(format!(
            "depth {} exceeds maximum {}",
            depth, config.max_depth
        )));
    }
    if sibling_count >= config.max_tasks_per_depth {
        return Err(TaskError::BreakdownLimitExceeded(format!(
            "parent {} already has {} subtasks (maximum {})",
            parent.id, sibling_count, config.max_tasks_per_depth
        )));
    }
    let length = description.chars().count();
    if length > config.max_description_length {
        return Err(TaskError::BreakdownLimitExceeded(format!(
            "description has {} characters (maximum {})",
            length, config.max_description_length
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(complexity: u8) -> Task {
        Task::new(ProjectId::new_v4(), TaskSpec::new("t", "").with_complexity(complexity))
    }

    #[test]
    fn test_reduction_schedule() {
        assert_eq!(reduced_complexity(9, 1), 7);
        assert_eq!(reduced_complexity(9, 2), 4);
        assert_eq!(reduced_complexity(9, 3), 4);
        assert_eq!(reduced_complexity(9, 4), 3);
        assert_eq!(reduced_complexity(9, 5), 3);
        assert_eq!(reduced_complexity(9, 6), 2);
        assert_eq!(reduced_complexity(9, 40), 2);
    }

    #[test]
    fn test_reduction_floor() {
        assert_eq!(reduced_complexity(2, 1), 1);
        assert_eq!(reduced_complexity(1, 1), 1);
        assert_eq!(reduced_complexity(1, 9), 1);
        assert_eq!(reduced_complexity(3, 2), 3);
    }

    #[test]
    fn test_auto_reduce_respects_threshold_and_flag() {
        let config = BreakdownConfig::default();
        let parent = task(9);

        let reduction = auto_reduce_parent_complexity(&parent, 1, &config).unwrap();
        assert_eq!(reduction.previous, 9);
        assert_eq!(reduction.reduced, 7);
        assert_eq!(
            auto_reduce_parent_complexity(&parent, 3, &config).map(|r| r.reduced),
            Some(4)
        );

        assert!(auto_reduce_parent_complexity(&task(7), 1, &config).is_none());
        assert!(auto_reduce_parent_complexity(&parent, 0, &config).is_none());

        // An already split parent keeps following the schedule below the threshold
        assert_eq!(
            auto_reduce_parent_complexity(&task(7), 3, &config).map(|r| r.reduced),
            Some(4)
        );
        assert!(auto_reduce_parent_complexity(&task(4), 2, &config).is_none());

        let disabled = BreakdownConfig {
            auto_reduce: false,
            ..BreakdownConfig::default()
        };
        assert!(auto_reduce_parent_complexity(&parent, 1, &disabled).is_none());
    }

    #[test]
    fn test_breakdown_excludes_decomposed_tasks() {
        let big = task(9);
        let split = task(10);
        let child = task(2).with_parent(&split);
        let small = task(3);
        let tasks = vec![big.clone(), split, child, small];

        let flagged = find_tasks_needing_breakdown(&tasks, &BreakdownConfig::default());
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].id, big.id);
    }

    #[test]
    fn test_child_limits() {
        let config = BreakdownConfig {
            max_depth: 2,
            max_tasks_per_depth: 2,
            max_description_length: 10,
            ..BreakdownConfig::default()
        };
        let root = task(5);
        let mid = task(5).with_parent(&root);
        let deep = task(5).with_parent(&mid);

        assert!(check_child_limits(&root, 0, "short", &config).is_ok());
        assert!(check_child_limits(&mid, 0, "short", &config).is_ok());
        assert!(check_child_limits(&deep, 0, "short", &config).is_err());
        assert!(check_child_limits(&root, 2, "short", &config).is_err());
        assert!(check_child_limits(&root, 0, "far too long text", &config).is_err());
    }
}
