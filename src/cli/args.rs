//! Command line argument parsing
//!
//! Subcommands:
//! - `next`: Select the next task from a project snapshot
//! - `validate`: Report cycles and broken references in a snapshot
//! - `recommend`: Suggest a selection strategy for a snapshot
//! - `breakdown`: List tasks that should be split into subtasks
//! - `chain`: Show what a task waits on, or what waits on it
//! - `check-transition`: Check a single state change against the transition table
//! - `matrix`: Print the full transition table
//! - `show-config`: Show configuration discovery information
//! - `init-config`: Write a default configuration file

use crate::env;
use crate::task::{StrategyPreference, resolve_strategy};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "nextask")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Dependency-aware selection of the next task to work on")]
#[command(long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Args {
    /// Configuration file path (skips discovery)
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long = "json", global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Project snapshot location shared by the analysis commands
#[derive(Debug, Clone, clap::Args)]
pub struct SnapshotArg {
    /// Project snapshot (JSON); defaults to ./.nextask/tasks.json
    #[arg(short = 's', long = "snapshot")]
    pub snapshot: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Select the next actionable task
    Next {
        #[command(flatten)]
        snapshot: SnapshotArg,
        /// Selection strategy (dependency-aware, depth-first, priority, creation-order, critical-path)
        #[arg(long = "strategy")]
        strategy: Option<String>,
        /// Use the recommended strategy for this project
        #[arg(long = "auto", conflicts_with = "strategy")]
        auto: bool,
        /// Let tasks with subtasks be selected
        #[arg(long = "allow-parents")]
        allow_parents: bool,
        /// Treat in-progress and pending tasks as one pool
        #[arg(long = "no-prefer-in-progress")]
        no_prefer_in_progress: bool,
        /// Number of alternatives to report
        #[arg(long = "alternatives", value_name = "N")]
        alternatives: Option<usize>,
    },
    /// Validate the dependency graph
    Validate {
        #[command(flatten)]
        snapshot: SnapshotArg,
    },
    /// Recommend a selection strategy
    Recommend {
        #[command(flatten)]
        snapshot: SnapshotArg,
    },
    /// List tasks that need to be broken down
    Breakdown {
        #[command(flatten)]
        snapshot: SnapshotArg,
        /// Complexity threshold override
        #[arg(long = "threshold", value_name = "N")]
        threshold: Option<u8>,
    },
    /// Show the dependency chain of a task
    Chain {
        /// Task id
        task_id: String,
        #[command(flatten)]
        snapshot: SnapshotArg,
        /// Show dependents instead of dependencies
        #[arg(long = "downstream")]
        downstream: bool,
    },
    /// Check a state transition
    CheckTransition {
        /// Current state ("none" for a project without state)
        from: String,
        /// Target state
        to: String,
        /// Check project states instead of task states
        #[arg(long = "project")]
        project: bool,
    },
    /// Print the transition matrix
    Matrix,
    /// Show configuration discovery information
    ShowConfig,
    /// Write a default configuration file
    InitConfig {
        /// Directory to create .nextask/config.toml in (defaults to ~/.nextask)
        #[arg(long = "dir")]
        dir: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(short = 'f', long = "force")]
        force: bool,
    },
}

impl Args {
    pub fn parse() -> Self {
        Parser::parse()
    }
}

impl SnapshotArg {
    /// Explicit snapshot path or the default under the current directory
    pub fn resolve(&self) -> PathBuf {
        self.snapshot.clone().unwrap_or_else(|| {
            let current_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            env::snapshot_file_path(&current_dir)
        })
    }
}

/// Strategy requested on the command line, keeping unknown names visible
pub fn strategy_preference(raw: Option<&str>) -> StrategyPreference {
    resolve_strategy(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::SelectionStrategy;

    #[test]
    fn test_next_command() {
        let args = Args::try_parse_from([
            "nextask",
            "--json",
            "next",
            "--snapshot",
            "project.json",
            "--strategy",
            "critical_path",
            "--alternatives",
            "5",
        ])
        .unwrap();

        assert!(args.json);
        match args.command {
            Some(Commands::Next {
                snapshot,
                strategy,
                auto,
                alternatives,
                ..
            }) => {
                assert_eq!(snapshot.resolve(), PathBuf::from("project.json"));
                assert_eq!(
                    strategy_preference(strategy.as_deref()),
                    StrategyPreference::Recognized(SelectionStrategy::CriticalPath)
                );
                assert!(!auto);
                assert_eq!(alternatives, Some(5));
            }
            other => panic!("Expected Next command, got {:?}", other),
        }
    }

    #[test]
    fn test_auto_conflicts_with_strategy() {
        let result =
            Args::try_parse_from(["nextask", "next", "--auto", "--strategy", "priority"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::try_parse_from(["nextask", "matrix", "--json", "-v"]).unwrap();
        assert!(args.json);
        assert!(args.verbose);
        assert!(matches!(args.command, Some(Commands::Matrix)));
    }

    #[test]
    fn test_chain_command() {
        let args = Args::try_parse_from([
            "nextask",
            "chain",
            "6f9619ff-8b86-d011-b42d-00cf4fc964ff",
            "--downstream",
        ])
        .unwrap();

        match args.command {
            Some(Commands::Chain {
                task_id,
                downstream,
                snapshot,
            }) => {
                assert_eq!(task_id, "6f9619ff-8b86-d011-b42d-00cf4fc964ff");
                assert!(downstream);
                assert!(snapshot.resolve().ends_with(".nextask/tasks.json"));
            }
            other => panic!("Expected Chain command, got {:?}", other),
        }
    }

    #[test]
    fn test_check_transition_command() {
        let args =
            Args::try_parse_from(["nextask", "check-transition", "none", "active", "--project"])
                .unwrap();
        match args.command {
            Some(Commands::CheckTransition { from, to, project }) => {
                assert_eq!(from, "none");
                assert_eq!(to, "active");
                assert!(project);
            }
            other => panic!("Expected CheckTransition command, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_strategy_stays_visible() {
        assert_eq!(
            strategy_preference(Some("fastest")),
            StrategyPreference::Unrecognized("fastest".to_string())
        );
        assert_eq!(strategy_preference(None), StrategyPreference::Unspecified);
    }
}
