use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::task::error::TaskError;
use crate::task::types::*;

/// Access to persisted projects and tasks.
///
/// Selection and graph analysis only need [`list_tasks_for_project`]; the point queries
/// serve display helpers and the write path in [`TaskManager`].
///
/// [`list_tasks_for_project`]: TaskStore::list_tasks_for_project
/// [`TaskManager`]: crate::task::TaskManager
pub trait TaskStore {
    fn list_tasks_for_project(&self, project_id: ProjectId) -> Result<Vec<Task>, TaskError>;

    fn get_task(&self, task_id: TaskId) -> Result<Task, TaskError>;

    /// Tasks that list `task_id` as a dependency
    fn get_dependent_tasks(&self, task_id: TaskId) -> Result<Vec<Task>, TaskError>;

    /// Tasks `task_id` depends on; ids with no stored task are skipped
    fn get_task_dependencies(&self, task_id: TaskId) -> Result<Vec<Task>, TaskError>;

    fn insert_task(&mut self, task: Task) -> Result<TaskId, TaskError>;

    fn update_task(&mut self, task: &Task) -> Result<(), TaskError>;

    fn get_project(&self, project_id: ProjectId) -> Result<Project, TaskError>;

    fn insert_project(&mut self, project: Project) -> Result<ProjectId, TaskError>;

    fn update_project(&mut self, project: &Project) -> Result<(), TaskError>;
}

/// Store keeping everything in memory
#[derive(Clone, Debug, Default)]
pub struct InMemoryTaskStore {
    projects: HashMap<ProjectId, Project>,
    tasks: HashMap<TaskId, Task>,
    /// Insertion order per project, so listings are stable
    order: HashMap<ProjectId, Vec<TaskId>>,
}

/// One project with its full task list, as read from or written to disk
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProjectSnapshot {
    pub project: Project,
    pub tasks: Vec<Task>,
}

impl InMemoryTaskStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot, keeping tasks in the order given.
    ///
    /// A repeated task id keeps its first entry. Tasks naming another project are moved
    /// into the snapshot's project.
    pub fn from_snapshot(snapshot: ProjectSnapshot) -> Self {
        let mut store = Self::new();
        let project_id = snapshot.project.id;
        store.projects.insert(project_id, snapshot.project);
        let order = store.order.entry(project_id).or_default();
        for mut task in snapshot.tasks {
            if store.tasks.contains_key(&task.id) {
                warn!("Skipping duplicate task {} in snapshot", task.id);
                continue;
            }
            if task.project_id != project_id {
                warn!(
                    "Task {} belongs to project {}, loading it into {}",
                    task.id, task.project_id, project_id
                );
                task.project_id = project_id;
            }
            order.push(task.id);
            store.tasks.insert(task.id, task);
        }
        store
    }

    /// Export one project with its tasks
    pub fn snapshot(&self, project_id: ProjectId) -> Result<ProjectSnapshot, TaskError> {
        Ok(ProjectSnapshot {
            project: self.get_project(project_id)?,
            tasks: self.list_tasks_for_project(project_id)?,
        })
    }

    pub fn project_ids(&self) -> Vec<ProjectId> {
        self.projects.keys().copied().collect()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }
}

impl TaskStore for InMemoryTaskStore {
    fn list_tasks_for_project(&self, project_id: ProjectId) -> Result<Vec<Task>, TaskError> {
        if !self.projects.contains_key(&project_id) {
            return Err(TaskError::ProjectNotFound(project_id));
        }
        Ok(self
            .order
            .get(&project_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.tasks.get(id))
            .cloned()
            .collect())
    }

    fn get_task(&self, task_id: TaskId) -> Result<Task, TaskError> {
        self.tasks
            .get(&task_id)
            .cloned()
            .ok_or(TaskError::TaskNotFound(task_id))
    }

    fn get_dependent_tasks(&self, task_id: TaskId) -> Result<Vec<Task>, TaskError> {
        let task = self.get_task(task_id)?;
        Ok(self
            .list_tasks_for_project(task.project_id)?
            .into_iter()
            .filter(|t| t.depends_on(task_id))
            .collect())
    }

    fn get_task_dependencies(&self, task_id: TaskId) -> Result<Vec<Task>, TaskError> {
        let task = self.get_task(task_id)?;
        Ok(task
            .dependencies
            .iter()
            .filter_map(|id| self.tasks.get(id))
            .cloned()
            .collect())
    }

    fn insert_task(&mut self, task: Task) -> Result<TaskId, TaskError> {
        let task_id = task.id;
        if !self.projects.contains_key(&task.project_id) {
            return Err(TaskError::ProjectNotFound(task.project_id));
        }
        if self.tasks.contains_key(&task_id) {
            return Err(TaskError::Storage(format!("task {} already exists", task_id)));
        }

        for dep_id in &task.dependencies {
            if !self.tasks.contains_key(dep_id) {
                warn!(
                    "Task {} has dependency {} that doesn't exist yet",
                    task_id, dep_id
                );
            }
        }

        self.order.entry(task.project_id).or_default().push(task_id);
        self.tasks.insert(task_id, task);
        debug!("Stored task {}", task_id);
        Ok(task_id)
    }

    fn update_task(&mut self, task: &Task) -> Result<(), TaskError> {
        match self.tasks.get_mut(&task.id) {
            Some(stored) => {
                *stored = task.clone();
                Ok(())
            }
            None => Err(TaskError::TaskNotFound(task.id)),
        }
    }

    fn get_project(&self, project_id: ProjectId) -> Result<Project, TaskError> {
        self.projects
            .get(&project_id)
            .cloned()
            .ok_or(TaskError::ProjectNotFound(project_id))
    }

    fn insert_project(&mut self, project: Project) -> Result<ProjectId, TaskError> {
        let project_id = project.id;
        if self.projects.contains_key(&project_id) {
            return Err(TaskError::Storage(format!(
                "project {} already exists",
                project_id
            )));
        }
        self.projects.insert(project_id, project);
        Ok(project_id)
    }

    fn update_project(&mut self, project: &Project) -> Result<(), TaskError> {
        match self.projects.get_mut(&project.id) {
            Some(stored) => {
                *stored = project.clone();
                Ok(())
            }
            None => Err(TaskError::ProjectNotFound(project.id)),
        }
    }
}

impl ProjectSnapshot {
    /// Read a snapshot from a JSON file
    pub fn from_json_file<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        use anyhow::Context;
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot {}", path.display()))
    }

    /// Write the snapshot as pretty-printed JSON
    pub fn to_json_file<P: AsRef<std::path::Path>>(&self, path: P) -> anyhow::Result<()> {
        use anyhow::Context;
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize snapshot")?;
        std::fs::write(path, content).context("Failed to write snapshot")
    }
}
