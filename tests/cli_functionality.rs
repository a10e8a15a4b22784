//! Integration tests for CLI functionality
//!
//! These tests verify that configuration discovery, snapshot loading and command
//! execution work together. Unit tests for individual functions are located in the
//! respective module files.

use nextask::cli::{Commands, ConfigDiscovery, NextaskConfig, SnapshotArg, execute, load_manager_from};
use nextask::task::{ProjectSnapshot, TaskStore};
use nextask::{Project, SelectionStrategy, Task, TaskPriority, TaskSpec, TaskState};
use serial_test::serial;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct CurrentDirGuard {
    previous: PathBuf,
}

impl CurrentDirGuard {
    fn enter(dir: &Path) -> Self {
        let previous = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir).unwrap();
        Self { previous }
    }
}

impl Drop for CurrentDirGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.previous);
    }
}

fn sample_snapshot() -> ProjectSnapshot {
    let project = Project::new("Release", "Ship version 2");
    let schema = Task::new(
        project.id,
        TaskSpec::new("Design schema", "").with_priority(TaskPriority::Low),
    );
    let api = Task::new(
        project.id,
        TaskSpec::new("Build API", "")
            .with_priority(TaskPriority::Critical)
            .with_dependencies(vec![schema.id]),
    );
    let docs = Task::new(project.id, TaskSpec::new("Write docs", "").with_complexity(9));

    ProjectSnapshot {
        tasks: vec![schema, api, docs],
        project,
    }
}

#[test]
#[serial]
fn test_local_config_is_discovered() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("nextask.toml"),
        "[selection]\nstrategy = \"priority\"\n",
    )
    .unwrap();

    let _guard = CurrentDirGuard::enter(temp_dir.path());

    let found = ConfigDiscovery::find_config_file().unwrap();
    assert_eq!(found.file_name().unwrap(), "nextask.toml");

    let config = ConfigDiscovery::discover_config().unwrap();
    assert_eq!(config.selection.strategy, SelectionStrategy::Priority);
}

#[test]
#[serial]
fn test_dot_dir_config_is_discovered() {
    let temp_dir = TempDir::new().unwrap();
    let path = ConfigDiscovery::create_default_config(Some(temp_dir.path()), false).unwrap();
    fs::write(&path, "log_filter = \"nextask=warn\"\n").unwrap();

    let _guard = CurrentDirGuard::enter(temp_dir.path());

    let config = ConfigDiscovery::load(None).unwrap();
    assert_eq!(config.log_filter, "nextask=warn");
}

#[test]
#[serial]
fn test_default_snapshot_location() {
    let temp_dir = TempDir::new().unwrap();
    let snapshot_path = temp_dir.path().join(".nextask").join("tasks.json");
    fs::create_dir_all(snapshot_path.parent().unwrap()).unwrap();
    sample_snapshot().to_json_file(&snapshot_path).unwrap();

    let _guard = CurrentDirGuard::enter(temp_dir.path());

    let outcome = execute(
        &Commands::Recommend {
            snapshot: SnapshotArg { snapshot: None },
        },
        &NextaskConfig::default(),
        false,
    )
    .unwrap();
    assert!(outcome.output.contains("dependency-aware"));
}

#[test]
fn test_config_override_is_used() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("custom.toml");
    fs::write(&path, "[breakdown]\ncomplexity_threshold = 3\n").unwrap();

    let config = ConfigDiscovery::load(Some(&path)).unwrap();
    assert_eq!(config.breakdown.complexity_threshold, 3);

    assert!(ConfigDiscovery::load(Some(&temp_dir.path().join("missing.toml"))).is_err());
}

#[test]
fn test_snapshot_selection_workflow() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tasks.json");
    let snapshot = sample_snapshot();
    snapshot.to_json_file(&path).unwrap();

    let schema_id = snapshot.tasks[0].id;
    let outcome = execute(
        &Commands::Next {
            snapshot: SnapshotArg {
                snapshot: Some(path.clone()),
            },
            strategy: None,
            auto: false,
            allow_parents: false,
            no_prefer_in_progress: false,
            alternatives: Some(1),
        },
        &NextaskConfig::default(),
        true,
    )
    .unwrap();
    assert_eq!(outcome.exit_code, 0);

    let value: serde_json::Value = serde_json::from_str(&outcome.output).unwrap();
    assert_eq!(value["task"]["id"], schema_id.to_string());
    assert_eq!(value["strategy"], "dependency-aware");
    assert_eq!(value["alternatives"].as_array().unwrap().len(), 1);

    let breakdown = execute(
        &Commands::Breakdown {
            snapshot: SnapshotArg {
                snapshot: Some(path.clone()),
            },
            threshold: None,
        },
        &NextaskConfig::default(),
        false,
    )
    .unwrap();
    assert!(breakdown.output.contains("Write docs"));
    assert!(!breakdown.output.contains("Build API"));
}

#[test]
fn test_manager_changes_can_be_saved() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tasks.json");
    let snapshot = sample_snapshot();
    let project_id = snapshot.project.id;
    let schema_id = snapshot.tasks[0].id;
    snapshot.to_json_file(&path).unwrap();

    let mut manager = load_manager_from(&path, &NextaskConfig::default()).unwrap();
    manager.transition_task(schema_id, TaskState::InProgress).unwrap();
    manager.transition_task(schema_id, TaskState::Completed).unwrap();

    let store = manager.into_store();
    store.snapshot(project_id).unwrap().to_json_file(&path).unwrap();

    let reloaded = ProjectSnapshot::from_json_file(&path).unwrap();
    let schema = reloaded.tasks.iter().find(|t| t.id == schema_id).unwrap();
    assert_eq!(schema.state, TaskState::Completed);
    assert!(schema.completed_at.is_some());

    // With the schema done, the critical API task is next
    let manager = load_manager_from(&path, &NextaskConfig::default()).unwrap();
    let next = manager.select_next(project_id).unwrap();
    assert_eq!(next.task.title, "Build API");
    assert_eq!(
        manager.store().get_task(schema_id).unwrap().state,
        TaskState::Completed
    );
}

#[test]
fn test_chain_command_output() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tasks.json");
    let snapshot = sample_snapshot();
    let api_id = snapshot.tasks[1].id;
    snapshot.to_json_file(&path).unwrap();

    let outcome = execute(
        &Commands::Chain {
            task_id: api_id.to_string(),
            snapshot: SnapshotArg {
                snapshot: Some(path),
            },
            downstream: false,
        },
        &NextaskConfig::default(),
        false,
    )
    .unwrap();

    assert_eq!(
        outcome.output,
        "* Build API [pending]\n  - Design schema [pending]\n"
    );
}
