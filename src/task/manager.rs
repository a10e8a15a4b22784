use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::task::breakdown::*;
use crate::task::error::TaskError;
use crate::task::graph::*;
use crate::task::selector::*;
use crate::task::state_machine::*;
use crate::task::store::*;
use crate::task::strategy::*;
use crate::task::types::*;

/// Central task management over a [`TaskStore`]
pub struct TaskManager<S: TaskStore = InMemoryTaskStore> {
    store: S,
    config: TaskManagerConfig,
    state_machine: StateMachine,
    event_handlers: Vec<Box<dyn TaskEventHandler>>,
}

/// Configuration for task manager
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskManagerConfig {
    pub selection: SelectionConfig,
    pub breakdown: BreakdownConfig,
    pub validation: ValidationMode,
}

/// Events that can occur during task management
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    ProjectCreated {
        project_id: ProjectId,
    },
    ProjectStateChanged {
        project_id: ProjectId,
        old_state: ProjectState,
        new_state: ProjectState,
    },
    TaskCreated {
        task_id: TaskId,
        parent_id: Option<TaskId>,
    },
    TaskStateChanged {
        task_id: TaskId,
        old_state: TaskState,
        new_state: TaskState,
    },
    DependencyAdded {
        task_id: TaskId,
        depends_on: TaskId,
    },
    DependencyRemoved {
        task_id: TaskId,
        depends_on: TaskId,
    },
    ComplexityReduced(ComplexityReduction),
}

/// Handler for task events
pub trait TaskEventHandler {
    fn handle_event(&self, event: &TaskEvent);
}

/// Graph health of one project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectReport {
    pub project_id: ProjectId,
    pub cycles: Vec<DependencyCycle>,
    pub issues: Vec<IntegrityIssue>,
    pub statistics: ProjectStatistics,
}

impl ProjectReport {
    pub fn is_healthy(&self) -> bool {
        self.cycles.is_empty() && self.issues.is_empty()
    }
}

impl<S: TaskStore> TaskManager<S> {
    /// Create a new task manager
    pub fn new(store: S, config: TaskManagerConfig) -> Self {
        Self {
            store,
            state_machine: StateMachine::new(config.validation),
            config,
            event_handlers: Vec::new(),
        }
    }

    pub fn add_event_handler(&mut self, handler: Box<dyn TaskEventHandler>) {
        self.event_handlers.push(handler);
    }

    pub fn config(&self) -> &TaskManagerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn emit_event(&self, event: TaskEvent) {
        for handler in &self.event_handlers {
            handler.handle_event(&event);
        }
    }

    /// Create an active project
    pub fn create_project(
        &mut self,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<ProjectId, TaskError> {
        let project = Project::new(title, description);
        let project_id = self.store.insert_project(project)?;
        self.emit_event(TaskEvent::ProjectCreated { project_id });
        info!("Created project {}", project_id);
        Ok(project_id)
    }

    /// Move a project to another state
    pub fn transition_project(
        &mut self,
        project_id: ProjectId,
        new_state: ProjectState,
    ) -> Result<(), TaskError> {
        let mut project = self.store.get_project(project_id)?;
        let old_state = project.state;
        self.state_machine
            .validate_project_transition(Some(old_state), new_state)?;

        project.state = new_state;
        self.store.update_project(&project)?;
        self.emit_event(TaskEvent::ProjectStateChanged {
            project_id,
            old_state,
            new_state,
        });
        debug!("Project {} moved {} -> {}", project_id, old_state, new_state);
        Ok(())
    }

    /// Create a new task, optionally as a subtask of `parent_id`
    pub fn create_task(
        &mut self,
        project_id: ProjectId,
        spec: TaskSpec,
        parent_id: Option<TaskId>,
    ) -> Result<TaskId, TaskError> {
        let project_tasks = self.store.list_tasks_for_project(project_id)?;

        let mut task = Task::new(project_id, spec);
        for &dep_id in &task.dependencies {
            if !project_tasks.iter().any(|t| t.id == dep_id) {
                return Err(TaskError::DependencyRejected {
                    from: task.id,
                    to: dep_id,
                    reason: "dependency is not a task of this project".to_string(),
                });
            }
        }

        let parent = match parent_id {
            Some(parent_id) => {
                let parent = project_tasks
                    .iter()
                    .find(|t| t.id == parent_id)
                    .cloned()
                    .ok_or(TaskError::TaskNotFound(parent_id))?;
                let siblings = project_tasks
                    .iter()
                    .filter(|t| t.parent_id == Some(parent_id))
                    .count();
                check_child_limits(&parent, siblings, &task.description, &self.config.breakdown)?;
                task = task.with_parent(&parent);
                Some((parent, siblings + 1))
            }
            None => None,
        };

        let task_id = self.store.insert_task(task)?;
        self.emit_event(TaskEvent::TaskCreated { task_id, parent_id });
        debug!("Created task {} with parent {:?}", task_id, parent_id);

        if let Some((parent, child_count)) = parent {
            self.reduce_parent_complexity(parent, child_count);
        }

        Ok(task_id)
    }

    // Persistence failures here are logged only; the child already exists
    fn reduce_parent_complexity(&mut self, mut parent: Task, child_count: usize) {
        let Some(reduction) =
            auto_reduce_parent_complexity(&parent, child_count, &self.config.breakdown)
        else {
            return;
        };

        parent.complexity = reduction.reduced;
        match self.store.update_task(&parent) {
            Ok(()) => {
                info!(
                    "Reduced complexity of task {} from {} to {} ({} subtasks)",
                    parent.id, reduction.previous, reduction.reduced, child_count
                );
                self.emit_event(TaskEvent::ComplexityReduced(reduction));
            }
            Err(e) => warn!(
                "Failed to persist complexity reduction for task {}: {}",
                parent.id, e
            ),
        }
    }

    /// Move a task to another state, returning lenient-mode warnings
    pub fn transition_task(
        &mut self,
        task_id: TaskId,
        new_state: TaskState,
    ) -> Result<Vec<TransitionWarning>, TaskError> {
        let mut task = self.store.get_task(task_id)?;
        let project_tasks = self.store.list_tasks_for_project(task.project_id)?;
        let old_state = task.state;

        let warnings = self
            .state_machine
            .validate_transition(old_state, new_state, &task, &project_tasks)?;
        for warning in &warnings {
            warn!("{}", warning);
        }

        if old_state == new_state {
            return Ok(warnings);
        }

        task.apply_state(new_state);
        self.store.update_task(&task)?;
        self.emit_event(TaskEvent::TaskStateChanged {
            task_id,
            old_state,
            new_state,
        });
        debug!("Task {} moved {} -> {}", task_id, old_state, new_state);
        Ok(warnings)
    }

    /// Make `task_id` depend on `depends_on`, refusing self-loops and cycles
    pub fn add_dependency(&mut self, task_id: TaskId, depends_on: TaskId) -> Result<(), TaskError> {
        let reject = |reason: &str| TaskError::DependencyRejected {
            from: task_id,
            to: depends_on,
            reason: reason.to_string(),
        };

        if task_id == depends_on {
            return Err(reject("a task cannot depend on itself"));
        }

        let mut task = self.store.get_task(task_id)?;
        let project_tasks = self.store.list_tasks_for_project(task.project_id)?;
        let graph = DependencyGraph::new(&project_tasks);

        if !graph.contains(depends_on) {
            return Err(reject("dependency is not a task of this project"));
        }
        if task.depends_on(depends_on) {
            return Ok(());
        }
        if graph.would_create_cycle(task_id, depends_on) {
            return Err(reject("the edge would create a dependency cycle"));
        }

        task.dependencies.push(depends_on);
        self.store.update_task(&task)?;
        self.emit_event(TaskEvent::DependencyAdded {
            task_id,
            depends_on,
        });
        Ok(())
    }

    pub fn remove_dependency(
        &mut self,
        task_id: TaskId,
        depends_on: TaskId,
    ) -> Result<bool, TaskError> {
        let mut task = self.store.get_task(task_id)?;
        let before = task.dependencies.len();
        task.dependencies.retain(|id| *id != depends_on);
        if task.dependencies.len() == before {
            return Ok(false);
        }

        self.store.update_task(&task)?;
        self.emit_event(TaskEvent::DependencyRemoved {
            task_id,
            depends_on,
        });
        Ok(true)
    }

    /// Select the next task for a project with the configured selection settings
    pub fn select_next(&self, project_id: ProjectId) -> Result<SelectionResult, TaskError> {
        self.select_next_with(project_id, &self.config.selection)
    }

    pub fn select_next_with(
        &self,
        project_id: ProjectId,
        selection: &SelectionConfig,
    ) -> Result<SelectionResult, TaskError> {
        let tasks = self.store.list_tasks_for_project(project_id)?;
        select_next_actionable_task(&tasks, selection)
    }

    pub fn recommend_strategy(
        &self,
        project_id: ProjectId,
    ) -> Result<StrategyRecommendation, TaskError> {
        let tasks = self.store.list_tasks_for_project(project_id)?;
        Ok(recommend_strategy(&tasks))
    }

    pub fn tasks_needing_breakdown(&self, project_id: ProjectId) -> Result<Vec<Task>, TaskError> {
        let tasks = self.store.list_tasks_for_project(project_id)?;
        Ok(find_tasks_needing_breakdown(&tasks, &self.config.breakdown))
    }

    /// Cycles, integrity issues and statistics for a project
    pub fn validate_project(&self, project_id: ProjectId) -> Result<ProjectReport, TaskError> {
        let tasks = self.store.list_tasks_for_project(project_id)?;
        let graph = DependencyGraph::new(&tasks);
        Ok(ProjectReport {
            project_id,
            cycles: graph.detect_cycles(),
            issues: graph.validate_referential_integrity(),
            statistics: graph.statistics(),
        })
    }

    /// Upstream or downstream chain of a task for display
    pub fn dependency_chain(
        &self,
        task_id: TaskId,
        direction: ChainDirection,
    ) -> Result<Vec<ChainEntry>, TaskError> {
        let task = self.store.get_task(task_id)?;
        let tasks = self.store.list_tasks_for_project(task.project_id)?;
        Ok(DependencyGraph::new(&tasks).chain(task_id, direction))
    }

    /// Direct dependencies and dependents of a task, straight from the store
    pub fn neighbors(&self, task_id: TaskId) -> Result<(Vec<Task>, Vec<Task>), TaskError> {
        Ok((
            self.store.get_task_dependencies(task_id)?,
            self.store.get_dependent_tasks(task_id)?,
        ))
    }
}

impl TaskManager<InMemoryTaskStore> {
    /// Manager over an empty in-memory store
    pub fn in_memory(config: TaskManagerConfig) -> Self {
        Self::new(InMemoryTaskStore::new(), config)
    }
}
