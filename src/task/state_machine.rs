//! Task and project state transition rules.
//!
//! The transition tables are fixed data; [`StateMachine`] only adds the choice between
//! strict validation and lenient validation, where the same table check runs but the
//! caller also receives advisory [`TransitionWarning`]s.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use tracing::debug;

use crate::task::error::TaskError;
use crate::task::types::*;

/// How much the validator reports beyond the table check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    #[default]
    Strict,
    Lenient,
}

/// Non-fatal observation produced by lenient validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransitionWarning {
    /// Work starts while some dependencies are not completed yet
    UnmetDependencies { task_id: TaskId, unmet: Vec<TaskId> },
    /// Work starts while some dependency ids point at nothing
    DanglingDependencies { task_id: TaskId, missing: Vec<TaskId> },
    /// A parent is completed before all of its children
    OpenChildren { task_id: TaskId, open: Vec<TaskId> },
}

/// Full transition table for introspection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionMatrix {
    pub task: BTreeMap<TaskState, Vec<TaskState>>,
    pub project: BTreeMap<ProjectState, Vec<ProjectState>>,
    /// Targets reachable from a project with no state yet
    pub project_initial: Vec<ProjectState>,
}

const PENDING_TARGETS: &[TaskState] = &[
    TaskState::InProgress,
    TaskState::Blocked,
    TaskState::Cancelled,
    TaskState::DeletionPending,
];
const IN_PROGRESS_TARGETS: &[TaskState] = &[
    TaskState::Completed,
    TaskState::Blocked,
    TaskState::Cancelled,
    TaskState::DeletionPending,
];
const BLOCKED_TARGETS: &[TaskState] = &[
    TaskState::Pending,
    TaskState::InProgress,
    TaskState::Cancelled,
    TaskState::DeletionPending,
];
const COMPLETED_TARGETS: &[TaskState] = &[TaskState::DeletionPending];
const CANCELLED_TARGETS: &[TaskState] = &[TaskState::Pending, TaskState::DeletionPending];

const PROJECT_ACTIVE_TARGETS: &[ProjectState] = &[
    ProjectState::Completed,
    ProjectState::Archived,
    ProjectState::DeletionPending,
];
const PROJECT_COMPLETED_TARGETS: &[ProjectState] = &[
    ProjectState::Archived,
    ProjectState::DeletionPending,
    ProjectState::Active,
];
const PROJECT_ARCHIVED_TARGETS: &[ProjectState] =
    &[ProjectState::Active, ProjectState::DeletionPending];
const PROJECT_INITIAL_TARGETS: &[ProjectState] = &[ProjectState::Active, ProjectState::Completed];

impl TaskState {
    /// States reachable from this one in a single step (excluding staying put)
    pub fn allowed_transitions(self) -> &'static [TaskState] {
        match self {
            TaskState::Pending => PENDING_TARGETS,
            TaskState::InProgress => IN_PROGRESS_TARGETS,
            TaskState::Blocked => BLOCKED_TARGETS,
            TaskState::Completed => COMPLETED_TARGETS,
            TaskState::Cancelled => CANCELLED_TARGETS,
            TaskState::DeletionPending => &[],
        }
    }

    pub fn can_transition_to(self, to: TaskState) -> bool {
        self == to || self.allowed_transitions().contains(&to)
    }
}

impl ProjectState {
    pub fn allowed_transitions(self) -> &'static [ProjectState] {
        match self {
            ProjectState::Active => PROJECT_ACTIVE_TARGETS,
            ProjectState::Completed => PROJECT_COMPLETED_TARGETS,
            ProjectState::Archived => PROJECT_ARCHIVED_TARGETS,
            ProjectState::DeletionPending => &[],
        }
    }
}

pub fn is_valid_task_state(s: &str) -> bool {
    TaskState::from_str(s).is_ok()
}

pub fn is_valid_project_state(s: &str) -> bool {
    ProjectState::from_str(s).is_ok()
}

/// Validates task and project state changes
#[derive(Debug, Clone, Copy, Default)]
pub struct StateMachine {
    mode: ValidationMode,
}

impl StateMachine {
    pub fn new(mode: ValidationMode) -> Self {
        Self { mode }
    }

    pub fn strict() -> Self {
        Self::new(ValidationMode::Strict)
    }

    pub fn lenient() -> Self {
        Self::new(ValidationMode::Lenient)
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    /// Check a task state change against the transition table.
    ///
    /// `project_tasks` is the task's project snapshot; it is only consulted in lenient
    /// mode to produce warnings and never turns an allowed transition into an error.
    pub fn validate_transition(
        &self,
        from: TaskState,
        to: TaskState,
        task: &Task,
        project_tasks: &[Task],
    ) -> Result<Vec<TransitionWarning>, TaskError> {
        if !from.can_transition_to(to) {
            debug!("Rejected transition {} -> {} for task {}", from, to, task.id);
            return Err(TaskError::InvalidStateTransition {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        if self.mode == ValidationMode::Strict || from == to {
            return Ok(Vec::new());
        }

        Ok(collect_warnings(to, task, project_tasks))
    }

    /// Same as [`validate_transition`](Self::validate_transition) for raw state names
    pub fn validate_transition_str(
        &self,
        from: &str,
        to: &str,
        task: &Task,
        project_tasks: &[Task],
    ) -> Result<Vec<TransitionWarning>, TaskError> {
        let from = TaskState::from_str(from)?;
        let to = TaskState::from_str(to)?;
        self.validate_transition(from, to, task, project_tasks)
    }

    /// Check a project state change; `None` is a project that has no state yet
    pub fn validate_project_transition(
        &self,
        from: Option<ProjectState>,
        to: ProjectState,
    ) -> Result<(), TaskError> {
        let allowed = match from {
            None => PROJECT_INITIAL_TARGETS.contains(&to),
            Some(from) => from == to || from.allowed_transitions().contains(&to),
        };

        if allowed {
            Ok(())
        } else {
            Err(TaskError::InvalidStateTransition {
                from: from.map(|s| s.to_string()).unwrap_or_default(),
                to: to.to_string(),
            })
        }
    }
}

fn collect_warnings(to: TaskState, task: &Task, project_tasks: &[Task]) -> Vec<TransitionWarning> {
    let by_id: HashMap<TaskId, &Task> = project_tasks.iter().map(|t| (t.id, t)).collect();
    let mut warnings = Vec::new();

    match to {
        TaskState::InProgress => {
            let mut unmet = Vec::new();
            let mut missing = Vec::new();
            for dep_id in &task.dependencies {
                match by_id.get(dep_id) {
                    Some(dep) if dep.is_completed() => {}
                    Some(_) => unmet.push(*dep_id),
                    None => missing.push(*dep_id),
                }
            }
            if !unmet.is_empty() {
                warnings.push(TransitionWarning::UnmetDependencies {
                    task_id: task.id,
                    unmet,
                });
            }
            if !missing.is_empty() {
                warnings.push(TransitionWarning::DanglingDependencies {
                    task_id: task.id,
                    missing,
                });
            }
        }
        TaskState::Completed => {
            let open: Vec<TaskId> = project_tasks
                .iter()
                .filter(|t| t.parent_id == Some(task.id) && !t.is_finished())
                .map(|t| t.id)
                .collect();
            if !open.is_empty() {
                warnings.push(TransitionWarning::OpenChildren {
                    task_id: task.id,
                    open,
                });
            }
        }
        _ => {}
    }

    warnings
}

/// The complete transition table
pub fn transition_matrix() -> TransitionMatrix {
    TransitionMatrix {
        task: TaskState::ALL
            .into_iter()
            .map(|s| (s, s.allowed_transitions().to_vec()))
            .collect(),
        project: ProjectState::ALL
            .into_iter()
            .map(|s| (s, s.allowed_transitions().to_vec()))
            .collect(),
        project_initial: PROJECT_INITIAL_TARGETS.to_vec(),
    }
}

impl std::fmt::Display for TransitionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionWarning::UnmetDependencies { task_id, unmet } => write!(
                f,
                "task {} starts with {} unmet dependencies",
                task_id,
                unmet.len()
            ),
            TransitionWarning::DanglingDependencies { task_id, missing } => write!(
                f,
                "task {} references {} missing dependencies",
                task_id,
                missing.len()
            ),
            TransitionWarning::OpenChildren { task_id, open } => write!(
                f,
                "task {} completed with {} open children",
                task_id,
                open.len()
            ),
        }
    }
}
