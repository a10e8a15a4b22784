use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::task::error::TaskError;

/// Unique identifier for tasks
pub type TaskId = Uuid;

/// Unique identifier for projects
pub type ProjectId = Uuid;

/// Lowest and highest complexity a task may carry
pub const MIN_COMPLEXITY: u8 = 1;
pub const MAX_COMPLEXITY: u8 = 10;

/// Complexity of a task when nothing else is said
pub const DEFAULT_COMPLEXITY: u8 = 5;

/// Core task structure as handed over by the store for one project
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub state: TaskState,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default = "default_complexity")]
    pub complexity: u8,
    #[serde(default)]
    pub depth: u32,
    #[serde(default)]
    pub parent_id: Option<TaskId>,
    #[serde(default)]
    pub dependencies: Vec<TaskId>,
    #[serde(default)]
    pub assigned_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub estimated_hours: Option<f64>,
}

fn default_complexity() -> u8 {
    DEFAULT_COMPLEXITY
}

/// Task lifecycle states
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Created and waiting to be picked up
    Pending,
    /// Someone is working on it
    InProgress,
    /// Held back by something outside the dependency graph
    Blocked,
    Completed,
    Cancelled,
    /// Marked for removal, terminal
    DeletionPending,
}

/// Project lifecycle states
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ProjectState {
    Active,
    Completed,
    Archived,
    DeletionPending,
}

/// Task priority levels with numeric values for scoring
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Background = 1,
    Low = 3,
    #[default]
    Normal = 5,
    High = 8,
    Critical = 10,
}

/// Container owning a task set
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Project {
    pub id: ProjectId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub state: ProjectState,
    pub created_at: DateTime<Utc>,
}

/// Task specification for creating new tasks
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TaskSpec {
    pub title: String,
    pub description: String,
    pub priority: TaskPriority,
    pub complexity: u8,
    pub dependencies: Vec<TaskId>,
    pub assigned_agent: Option<String>,
    pub estimated_hours: Option<f64>,
}

impl Task {
    /// Create a new pending root task with the given specification
    pub fn new(project_id: ProjectId, spec: TaskSpec) -> Self {
        let id = Uuid::new_v4();
        let mut dependencies = Vec::with_capacity(spec.dependencies.len());
        for dep in spec.dependencies {
            if dep != id && !dependencies.contains(&dep) {
                dependencies.push(dep);
            }
        }

        Self {
            id,
            project_id,
            title: spec.title,
            description: spec.description,
            state: TaskState::Pending,
            priority: spec.priority,
            complexity: spec.complexity.clamp(MIN_COMPLEXITY, MAX_COMPLEXITY),
            depth: 0,
            parent_id: None,
            dependencies,
            assigned_agent: spec.assigned_agent,
            created_at: Utc::now(),
            completed_at: None,
            estimated_hours: spec.estimated_hours,
        }
    }

    /// Attach the task under a parent, deriving its depth
    pub fn with_parent(mut self, parent: &Task) -> Self {
        self.parent_id = Some(parent.id);
        self.depth = parent.depth + 1;
        self
    }

    /// Completed or cancelled work no longer needs attention from the selector
    pub fn is_finished(&self) -> bool {
        matches!(
            self.state,
            TaskState::Completed | TaskState::Cancelled | TaskState::DeletionPending
        )
    }

    /// Pending or in-progress, i.e. a potential selection candidate
    pub fn is_open(&self) -> bool {
        matches!(self.state, TaskState::Pending | TaskState::InProgress)
    }

    pub fn is_completed(&self) -> bool {
        self.state == TaskState::Completed
    }

    pub fn depends_on(&self, task_id: TaskId) -> bool {
        self.dependencies.contains(&task_id)
    }

    /// Get priority as numeric value for scoring
    pub fn priority_value(&self) -> u8 {
        self.priority.value()
    }

    /// Apply a state change, keeping the completion timestamp in step
    pub fn apply_state(&mut self, state: TaskState) {
        if state == TaskState::Completed && self.state != TaskState::Completed {
            self.completed_at = Some(Utc::now());
        } else if state != TaskState::Completed {
            self.completed_at = None;
        }
        self.state = state;
    }

    /// Short label for log lines and chain output
    pub fn label(&self) -> String {
        format!("{} [{}]", self.title, self.state)
    }
}

impl TaskSpec {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            priority: TaskPriority::Normal,
            complexity: DEFAULT_COMPLEXITY,
            dependencies: Vec::new(),
            assigned_agent: None,
            estimated_hours: None,
        }
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_complexity(mut self, complexity: u8) -> Self {
        self.complexity = complexity;
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<TaskId>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn assigned_to(mut self, agent: impl Into<String>) -> Self {
        self.assigned_agent = Some(agent.into());
        self
    }

    pub fn with_estimate(mut self, hours: f64) -> Self {
        self.estimated_hours = Some(hours);
        self
    }
}

impl Project {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            state: ProjectState::Active,
            created_at: Utc::now(),
        }
    }
}

impl TaskPriority {
    /// Get numeric value for calculations
    pub fn value(&self) -> u8 {
        *self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Background => "background",
            TaskPriority::Low => "low",
            TaskPriority::Normal => "normal",
            TaskPriority::High => "high",
            TaskPriority::Critical => "critical",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TaskState {
    pub const ALL: [TaskState; 6] = [
        TaskState::Pending,
        TaskState::InProgress,
        TaskState::Blocked,
        TaskState::Completed,
        TaskState::Cancelled,
        TaskState::DeletionPending,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::InProgress => "in_progress",
            TaskState::Blocked => "blocked",
            TaskState::Completed => "completed",
            TaskState::Cancelled => "cancelled",
            TaskState::DeletionPending => "deletion_pending",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskState {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_state_name(s);
        TaskState::ALL
            .into_iter()
            .find(|state| state.as_str() == normalized)
            .ok_or_else(|| TaskError::InvalidState(s.to_string()))
    }
}

impl ProjectState {
    pub const ALL: [ProjectState; 4] = [
        ProjectState::Active,
        ProjectState::Completed,
        ProjectState::Archived,
        ProjectState::DeletionPending,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectState::Active => "active",
            ProjectState::Completed => "completed",
            ProjectState::Archived => "archived",
            ProjectState::DeletionPending => "deletion_pending",
        }
    }
}

impl fmt::Display for ProjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectState {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_state_name(s);
        ProjectState::ALL
            .into_iter()
            .find(|state| state.as_str() == normalized)
            .ok_or_else(|| TaskError::InvalidState(s.to_string()))
    }
}

// "In-Progress", "in progress" and "IN_PROGRESS" all name the same state
fn normalize_state_name(s: &str) -> String {
    s.trim().to_ascii_lowercase().replace(['-', ' '], "_")
}
