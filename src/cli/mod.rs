//! CLI-specific functionality for nextask
//!
//! This module contains argument parsing, configuration discovery and the command
//! implementations behind the `nextask` binary.

pub mod args;
pub mod commands;
pub mod config;

pub use args::{Args, Commands, SnapshotArg};
pub use commands::{Outcome, execute, load_manager_from};
pub use config::{ConfigDiscovery, NextaskConfig};
