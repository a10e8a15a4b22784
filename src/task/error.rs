use thiserror::Error;

use crate::task::graph::DependencyCycle;
use crate::task::types::{ProjectId, TaskId};

/// Errors and reportable outcomes of the task engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskError {
    #[error("Invalid state transition from '{from}' to '{to}'")]
    InvalidStateTransition { from: String, to: String },

    #[error("Unrecognized state '{0}'")]
    InvalidState(String),

    #[error("No pending or in-progress tasks")]
    NoTasks,

    #[error("No actionable task: {reason}")]
    NoActionable { reason: String },

    #[error("Deadlock: {} pending task(s) wait on dependencies that cannot complete", .blocked.len())]
    Deadlock { blocked: Vec<TaskId> },

    #[error("Circular dependency blocks selection: {}", format_cycles(.cycles))]
    CircularDependency { cycles: Vec<DependencyCycle> },

    #[error("Task {task_id} depends on missing task {missing}")]
    DanglingDependency { task_id: TaskId, missing: TaskId },

    #[error("{} task(s) in progress but none has its dependencies met", .in_progress.len())]
    DataInconsistency { in_progress: Vec<TaskId> },

    #[error("Task {0} not found")]
    TaskNotFound(TaskId),

    #[error("Project {0} not found")]
    ProjectNotFound(ProjectId),

    #[error("Dependency {from} -> {to} rejected: {reason}")]
    DependencyRejected {
        from: TaskId,
        to: TaskId,
        reason: String,
    },

    #[error("Breakdown limit exceeded: {0}")]
    BreakdownLimitExceeded(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl TaskError {
    /// True for the "nothing to select" family, which callers report rather than abort on
    pub fn is_selection_outcome(&self) -> bool {
        matches!(
            self,
            TaskError::NoTasks
                | TaskError::NoActionable { .. }
                | TaskError::Deadlock { .. }
                | TaskError::CircularDependency { .. }
                | TaskError::DanglingDependency { .. }
                | TaskError::DataInconsistency { .. }
        )
    }
}

fn format_cycles(cycles: &[DependencyCycle]) -> String {
    cycles
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
