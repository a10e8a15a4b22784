//! # nextask
//!
//! Dependency-aware task selection for hierarchical project plans. Given the full task
//! set of a project, nextask answers "what should be worked on next?" under a choice of
//! selection strategies, while keeping the dependency graph and task states consistent.
//!
//! ## Architecture Overview
//!
//! - **[`task`]**: State machine, dependency graph analysis, scoring strategies, the
//!   task selector, breakdown heuristics, and the [`TaskManager`] write path over a
//!   [`TaskStore`]
//! - **[`cli`]**: Argument parsing, configuration discovery and command rendering for
//!   the `nextask` binary
//! - **[`env`]**: Path constants shared by configuration discovery and the CLI
//!
//! ## Quick Start
//!
//! ```rust
//! use nextask::{SelectionConfig, TaskManager, TaskManagerConfig, TaskSpec};
//!
//! # fn main() -> Result<(), nextask::TaskError> {
//! let mut manager = TaskManager::in_memory(TaskManagerConfig::default());
//! let project = manager.create_project("Website", "Relaunch")?;
//!
//! let design = manager.create_task(project, TaskSpec::new("Design", ""), None)?;
//! manager.create_task(
//!     project,
//!     TaskSpec::new("Build", "").with_dependencies(vec![design]),
//!     None,
//! )?;
//!
//! let next = manager.select_next_with(project, &SelectionConfig::default())?;
//! assert_eq!(next.task.id, design);
//! # Ok(())
//! # }
//! ```

/// Task selection engine and task management.
///
/// Validates state transitions, analyzes dependency graphs, scores candidates under
/// pluggable strategies and flags tasks that need to be broken down.
pub mod task;

/// Command line interface support.
pub mod cli;

/// Environment constants and path utilities.
pub mod env;

pub use task::{
    DependencyGraph, InMemoryTaskStore, Project, ProjectSnapshot, ProjectState,
    SelectionConfig, SelectionResult, SelectionStrategy, StateMachine, Task, TaskError,
    TaskId, TaskManager, TaskManagerConfig, TaskPriority, TaskSelector, TaskSpec, TaskState,
    TaskStore,
};
