//! Command execution for the `nextask` binary
//!
//! Every command loads what it needs, runs the library operation and renders the result
//! as text or JSON. Printing is left to the caller.

use crate::cli::args::{Commands, SnapshotArg, strategy_preference};
use crate::cli::config::{ConfigDiscovery, NextaskConfig};
use crate::task::*;
use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// Rendered command result
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub output: String,
    pub exit_code: i32,
}

impl Outcome {
    fn success(output: String) -> Self {
        Self {
            output,
            exit_code: 0,
        }
    }

    fn failure(output: String) -> Self {
        Self {
            output,
            exit_code: 1,
        }
    }
}

#[derive(Serialize)]
struct OutcomeReport<'a> {
    outcome: &'a str,
    message: String,
}

/// Run one subcommand against the loaded configuration
pub fn execute(command: &Commands, config: &NextaskConfig, json: bool) -> Result<Outcome> {
    match command {
        Commands::Next {
            snapshot,
            strategy,
            auto,
            allow_parents,
            no_prefer_in_progress,
            alternatives,
        } => {
            let manager = load_manager(snapshot, config)?;
            let project_id = manager_project(&manager)?;

            let mut selection = config.selection.clone();
            if *auto {
                let recommendation = manager.recommend_strategy(project_id)?;
                info!(
                    "Using recommended strategy {}: {}",
                    recommendation.strategy, recommendation.reason
                );
                selection.strategy = recommendation.strategy;
            } else {
                selection.strategy =
                    strategy_preference(strategy.as_deref()).or_fallback(selection.strategy);
            }
            selection.allow_parent_with_subtasks |= *allow_parents;
            if *no_prefer_in_progress {
                selection.prefer_in_progress = false;
            }
            if let Some(n) = alternatives {
                selection.max_alternatives = *n;
            }

            match manager.select_next_with(project_id, &selection) {
                Ok(result) => render(json, &result, render_selection).map(Outcome::success),
                Err(e) if e.is_selection_outcome() => {
                    let report = OutcomeReport {
                        outcome: outcome_kind(&e),
                        message: e.to_string(),
                    };
                    render(json, &report, |r| format!("No task selected: {}\n", r.message))
                        .map(Outcome::failure)
                }
                Err(e) => Err(e.into()),
            }
        }
        Commands::Validate { snapshot } => {
            let manager = load_manager(snapshot, config)?;
            let report = manager.validate_project(manager_project(&manager)?)?;
            let exit_code = if report.is_healthy() { 0 } else { 1 };
            let output = render(json, &report, render_report)?;
            Ok(Outcome { output, exit_code })
        }
        Commands::Recommend { snapshot } => {
            let manager = load_manager(snapshot, config)?;
            let recommendation = manager.recommend_strategy(manager_project(&manager)?)?;
            render(json, &recommendation, |r| {
                format!("Recommended strategy: {}\n  {}\n", r.strategy, r.reason)
            })
            .map(Outcome::success)
        }
        Commands::Breakdown {
            snapshot,
            threshold,
        } => {
            let mut config = config.clone();
            if let Some(threshold) = threshold {
                config.breakdown.complexity_threshold = *threshold;
            }
            let manager = load_manager(snapshot, &config)?;
            let tasks = manager.tasks_needing_breakdown(manager_project(&manager)?)?;
            render(json, &tasks, |tasks| render_breakdown(tasks, &config.breakdown))
                .map(Outcome::success)
        }
        Commands::Chain {
            task_id,
            snapshot,
            downstream,
        } => {
            let task_id = TaskId::parse_str(task_id)
                .with_context(|| format!("Invalid task id '{}'", task_id))?;
            let manager = load_manager(snapshot, config)?;
            let direction = if *downstream {
                ChainDirection::Downstream
            } else {
                ChainDirection::Upstream
            };
            let entries = manager.dependency_chain(task_id, direction)?;
            let (dependencies, dependents) = manager.neighbors(task_id)?;
            debug!(
                "Task {} has {} direct dependencies and {} dependents",
                task_id,
                dependencies.len(),
                dependents.len()
            );
            render(json, &entries, |entries| render_chain(entries)).map(Outcome::success)
        }
        Commands::CheckTransition { from, to, project } => {
            check_transition(from, to, *project, json)
        }
        Commands::Matrix => render(json, &transition_matrix(), render_matrix).map(Outcome::success),
        Commands::ShowConfig => {
            if json {
                return Ok(Outcome::success(serde_json::to_string_pretty(config)?));
            }
            Ok(Outcome::success(format!(
                "{}\nEffective configuration:\n{}",
                ConfigDiscovery::discovery_info(),
                config.to_toml_string()?
            )))
        }
        Commands::InitConfig { dir, force } => {
            let path = ConfigDiscovery::create_default_config(dir.as_deref(), *force)?;
            Ok(Outcome::success(format!(
                "Configuration file: {}\n",
                path.display()
            )))
        }
    }
}

/// Load a snapshot file into a manager configured from `config`
pub fn load_manager(snapshot: &SnapshotArg, config: &NextaskConfig) -> Result<TaskManager> {
    load_manager_from(&snapshot.resolve(), config)
}

pub fn load_manager_from(path: &Path, config: &NextaskConfig) -> Result<TaskManager> {
    let snapshot = ProjectSnapshot::from_json_file(path)?;
    debug!(
        "Loaded project {} with {} tasks from {}",
        snapshot.project.id,
        snapshot.tasks.len(),
        path.display()
    );
    Ok(TaskManager::new(
        InMemoryTaskStore::from_snapshot(snapshot),
        config.task_manager_config(),
    ))
}

fn manager_project(manager: &TaskManager) -> Result<ProjectId> {
    match manager.store().project_ids().as_slice() {
        [project_id] => Ok(*project_id),
        ids => bail!("Expected exactly one project in snapshot, found {}", ids.len()),
    }
}

fn check_transition(from: &str, to: &str, project: bool, json: bool) -> Result<Outcome> {
    let verdict = if project {
        let from = match from.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "initial" => None,
            _ => Some(ProjectState::from_str(from)?),
        };
        let to = ProjectState::from_str(to)?;
        StateMachine::strict().validate_project_transition(from, to)
    } else {
        let from = TaskState::from_str(from)?;
        let to = TaskState::from_str(to)?;
        let probe = Task::new(ProjectId::nil(), TaskSpec::new("probe", ""));
        StateMachine::strict()
            .validate_transition(from, to, &probe, &[])
            .map(|_| ())
    };

    let report = match &verdict {
        Ok(()) => OutcomeReport {
            outcome: "allowed",
            message: format!("{} -> {} is allowed", from, to),
        },
        Err(e) => OutcomeReport {
            outcome: "rejected",
            message: e.to_string(),
        },
    };
    let output = render(json, &report, |r| format!("{}\n", r.message))?;
    Ok(if verdict.is_ok() {
        Outcome::success(output)
    } else {
        Outcome::failure(output)
    })
}

fn outcome_kind(error: &TaskError) -> &'static str {
    match error {
        TaskError::NoTasks => "no_tasks",
        TaskError::NoActionable { .. } => "no_actionable",
        TaskError::Deadlock { .. } => "deadlock",
        TaskError::CircularDependency { .. } => "circular_dependency",
        TaskError::DanglingDependency { .. } => "dangling_dependency",
        TaskError::DataInconsistency { .. } => "data_inconsistency",
        _ => "error",
    }
}

fn render<T: Serialize>(json: bool, value: &T, text: impl FnOnce(&T) -> String) -> Result<String> {
    if json {
        let mut out =
            serde_json::to_string_pretty(value).context("Failed to serialize output as JSON")?;
        out.push('\n');
        Ok(out)
    } else {
        Ok(text(value))
    }
}

fn render_selection(result: &SelectionResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Next task: {} ({})", result.task.title, result.task.id);
    let _ = writeln!(out, "  {}", result.reason);
    let _ = writeln!(
        out,
        "  score {:.2} | unblocks {} | dependents {} | depth {} | priority {} | chain {}",
        result.score.raw_score,
        result.score.unblocked_count,
        result.score.dependent_count,
        result.score.depth,
        result.score.priority,
        result.score.critical_path_length
    );
    if !result.alternatives.is_empty() {
        let _ = writeln!(out, "Alternatives:");
        for alt in &result.alternatives {
            let _ = writeln!(
                out,
                "  - {} ({}) score {:.2}",
                alt.title, alt.task_id, alt.score.raw_score
            );
        }
    }
    out
}

fn render_report(report: &ProjectReport) -> String {
    let mut out = String::new();
    let stats = &report.statistics;
    let _ = writeln!(
        out,
        "{} tasks, {} dependency edges, max depth {}, {:.1}% complete",
        stats.total_tasks, stats.dependency_edges, stats.max_depth, stats.completion_percentage
    );

    if report.is_healthy() {
        let _ = writeln!(out, "No cycles or broken references found");
        return out;
    }
    for cycle in &report.cycles {
        let _ = writeln!(out, "cycle: {}", cycle);
    }
    for issue in &report.issues {
        let _ = writeln!(out, "issue: {}", issue);
    }
    out
}

fn render_breakdown(tasks: &[Task], config: &BreakdownConfig) -> String {
    if tasks.is_empty() {
        return format!(
            "No tasks at or above complexity {} without subtasks\n",
            config.complexity_threshold
        );
    }
    let mut out = String::new();
    for task in tasks {
        let _ = writeln!(
            out,
            "{} ({}) complexity {}",
            task.title, task.id, task.complexity
        );
    }
    out
}

fn render_matrix(matrix: &TransitionMatrix) -> String {
    let join = |states: Vec<String>| {
        if states.is_empty() {
            "(terminal)".to_string()
        } else {
            states.join(", ")
        }
    };

    let mut out = String::from("Task transitions:\n");
    for (from, targets) in &matrix.task {
        let _ = writeln!(
            out,
            "  {:<17} -> {}",
            from.as_str(),
            join(targets.iter().map(|s| s.to_string()).collect())
        );
    }
    out.push_str("Project transitions:\n");
    let _ = writeln!(
        out,
        "  {:<17} -> {}",
        "(none)",
        join(matrix.project_initial.iter().map(|s| s.to_string()).collect())
    );
    for (from, targets) in &matrix.project {
        let _ = writeln!(
            out,
            "  {:<17} -> {}",
            from.as_str(),
            join(targets.iter().map(|s| s.to_string()).collect())
        );
    }
    out
}
