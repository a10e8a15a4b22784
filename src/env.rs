//! Environment constants and path utilities for nextask.
//!
//! This module centralizes the hardcoded paths and file names used by configuration
//! discovery and the command line tool.

use std::path::{Path, PathBuf};

/// Application directory name (hidden directory like .git, .vscode)
pub const NEXTASK_DIR_NAME: &str = ".nextask";

/// Configuration file name inside the application directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Stand-alone configuration file name in a project root
pub const LOCAL_CONFIG_FILE_NAME: &str = "nextask.toml";

/// System-wide configuration file (Unix-like systems)
pub const SYSTEM_CONFIG_PATH: &str = "/etc/nextask/config.toml";

/// Default project snapshot file name
pub const SNAPSHOT_FILE_NAME: &str = "tasks.json";

/// Default tracing filter when neither `RUST_LOG` nor the config sets one
pub const DEFAULT_LOG_FILTER: &str = "nextask=info";

/// Build the .nextask directory path from a project root
pub fn nextask_dir_path(root: &Path) -> PathBuf {
    root.join(NEXTASK_DIR_NAME)
}

/// Build config directory path in user's home directory
pub fn user_config_dir_path(home_dir: &Path) -> PathBuf {
    nextask_dir_path(home_dir)
}

/// Build config file path in user's home directory
pub fn user_config_file_path(home_dir: &Path) -> PathBuf {
    user_config_dir_path(home_dir).join(CONFIG_FILE_NAME)
}

/// Build `./nextask.toml`
pub fn root_config_file_path(current_dir: &Path) -> PathBuf {
    current_dir.join(LOCAL_CONFIG_FILE_NAME)
}

/// Build `./.nextask/config.toml`
pub fn local_config_file_path(current_dir: &Path) -> PathBuf {
    nextask_dir_path(current_dir).join(CONFIG_FILE_NAME)
}

/// Build the default snapshot path inside a project root
pub fn snapshot_file_path(root: &Path) -> PathBuf {
    nextask_dir_path(root).join(SNAPSHOT_FILE_NAME)
}
