//! Configuration discovery and loading
//!
//! This module handles the configuration discovery hierarchy:
//! 1. Current directory: ./nextask.toml or ./.nextask/config.toml
//! 2. User config: ~/.nextask/config.toml
//! 3. System config: /etc/nextask/config.toml
//! 4. Built-in defaults

use crate::env;
use crate::task::{BreakdownConfig, SelectionConfig, TaskManagerConfig, ValidationMode};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env as std_env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Everything nextask reads from a config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NextaskConfig {
    /// Tracing filter used when `RUST_LOG` is not set
    pub log_filter: String,
    pub validation: ValidationMode,
    pub selection: SelectionConfig,
    pub breakdown: BreakdownConfig,
}

impl Default for NextaskConfig {
    fn default() -> Self {
        Self {
            log_filter: env::DEFAULT_LOG_FILTER.to_string(),
            validation: ValidationMode::default(),
            selection: SelectionConfig::default(),
            breakdown: BreakdownConfig::default(),
        }
    }
}

impl NextaskConfig {
    /// Settings for a [`TaskManager`](crate::task::TaskManager)
    pub fn task_manager_config(&self) -> TaskManagerConfig {
        TaskManagerConfig {
            selection: self.selection.clone(),
            breakdown: self.breakdown.clone(),
            validation: self.validation,
        }
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }

    /// Save configuration to a TOML file
    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.to_toml_string()?;
        fs::write(path, content).context("Failed to write config file")
    }

    /// Convert configuration to a TOML string
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

/// Configuration discovery system
pub struct ConfigDiscovery;

impl ConfigDiscovery {
    /// Load the override when given, otherwise walk the discovery hierarchy
    pub fn load(config_override: Option<&Path>) -> Result<NextaskConfig> {
        match config_override {
            Some(path) => {
                info!("Loading configuration override from: {:?}", path);
                NextaskConfig::from_toml_file(path)
            }
            None => Self::discover_config(),
        }
    }

    /// Discover and load configuration using the hierarchy
    pub fn discover_config() -> Result<NextaskConfig> {
        if let Some(config_path) = Self::find_config_file() {
            info!("Loading configuration from: {:?}", config_path);
            return NextaskConfig::from_toml_file(config_path);
        }

        debug!("No configuration file found, using defaults");
        Ok(NextaskConfig::default())
    }

    /// Find configuration file using discovery hierarchy
    pub fn find_config_file() -> Option<PathBuf> {
        for candidate in Self::config_candidates() {
            debug!("Checking for config file: {:?}", candidate);
            if candidate.is_file() {
                debug!("Found config file: {:?}", candidate);
                return Some(candidate);
            }
        }

        debug!("No config file found in discovery hierarchy");
        None
    }

    /// Configuration file candidates in priority order
    pub fn config_candidates() -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Ok(current_dir) = std_env::current_dir() {
            candidates.push(env::root_config_file_path(&current_dir));
            candidates.push(env::local_config_file_path(&current_dir));
        }

        if let Some(home_dir) = Self::home_dir() {
            candidates.push(env::user_config_file_path(&home_dir));
        }

        #[cfg(unix)]
        candidates.push(PathBuf::from(env::SYSTEM_CONFIG_PATH));

        #[cfg(windows)]
        if let Ok(program_data) = std_env::var("PROGRAMDATA") {
            candidates.push(
                PathBuf::from(program_data)
                    .join("nextask")
                    .join(env::CONFIG_FILE_NAME),
            );
        }

        candidates
    }

    fn home_dir() -> Option<PathBuf> {
        std_env::var("HOME")
            .ok()
            .or_else(|| std_env::var("USERPROFILE").ok())
            .map(PathBuf::from)
    }

    /// Write a default config file into `dir`, or the user config location when `None`.
    ///
    /// An existing file is left untouched unless `force` is set.
    pub fn create_default_config(dir: Option<&Path>, force: bool) -> Result<PathBuf> {
        let config_path = match dir {
            Some(dir) => env::local_config_file_path(dir),
            None => {
                let home_dir = Self::home_dir().context("Could not determine home directory")?;
                env::user_config_file_path(&home_dir)
            }
        };

        if let Some(config_dir) = config_path.parent()
            && !config_dir.exists()
        {
            fs::create_dir_all(config_dir).with_context(|| {
                format!("Failed to create configuration directory {:?}", config_dir)
            })?;
            info!("Created configuration directory: {:?}", config_dir);
        }

        if config_path.exists() && !force {
            warn!("Configuration file already exists: {:?}", config_path);
        } else {
            NextaskConfig::default().to_toml_file(&config_path)?;
            info!("Created default configuration file: {:?}", config_path);
        }

        Ok(config_path)
    }

    /// Describe the configuration discovery hierarchy for debugging
    pub fn discovery_info() -> String {
        let mut info = String::from("Configuration Discovery Hierarchy:\n\n");

        for (i, candidate) in Self::config_candidates().iter().enumerate() {
            let status = if candidate.is_file() {
                "EXISTS"
            } else if candidate.exists() {
                "NOT A FILE"
            } else {
                "NOT FOUND"
            };
            info.push_str(&format!("  {}. {:?} - {}\n", i + 1, candidate, status));
        }

        info.push('\n');
        match Self::find_config_file() {
            Some(found) => info.push_str(&format!("Active configuration: {:?}\n", found)),
            None => info.push_str("Active configuration: Built-in defaults\n"),
        }
        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::SelectionStrategy;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = NextaskConfig::default();
        assert_eq!(config.log_filter, "nextask=info");
        assert_eq!(config.validation, ValidationMode::Strict);

        let manager_config = config.task_manager_config();
        assert_eq!(manager_config.selection, SelectionConfig::default());
        assert_eq!(manager_config.breakdown.complexity_threshold, 8);
    }

    #[test]
    fn test_config_serialization() {
        let config = NextaskConfig::default();
        let toml_string = config.to_toml_string().unwrap();
        assert!(toml_string.contains("[selection]"));
        assert!(toml_string.contains("[breakdown]"));

        let deserialized = NextaskConfig::from_toml_str(&toml_string).unwrap();
        assert_eq!(deserialized, config);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = NextaskConfig::from_toml_str(
            r#"
validation = "lenient"

[selection]
strategy = "critical-path"
max_alternatives = 1
"#,
        )
        .unwrap();

        assert_eq!(config.validation, ValidationMode::Lenient);
        assert_eq!(config.selection.strategy, SelectionStrategy::CriticalPath);
        assert_eq!(config.selection.max_alternatives, 1);
        assert!(config.selection.prefer_in_progress);
        assert_eq!(config.breakdown, BreakdownConfig::default());
    }

    #[test]
    fn test_create_default_config_in_dir() {
        let temp_dir = TempDir::new().unwrap();

        let path = ConfigDiscovery::create_default_config(Some(temp_dir.path()), false).unwrap();
        assert_eq!(path, temp_dir.path().join(".nextask").join("config.toml"));

        let loaded = NextaskConfig::from_toml_file(&path).unwrap();
        assert_eq!(loaded, NextaskConfig::default());

        // Existing files survive without force
        fs::write(&path, "log_filter = \"nextask=debug\"\n").unwrap();
        ConfigDiscovery::create_default_config(Some(temp_dir.path()), false).unwrap();
        let kept = NextaskConfig::from_toml_file(&path).unwrap();
        assert_eq!(kept.log_filter, "nextask=debug");
    }

    #[test]
    fn test_config_candidates() {
        let candidates = ConfigDiscovery::config_candidates();
        assert!(!candidates.is_empty());
        assert!(candidates[0].file_name().unwrap() == "nextask.toml");
    }
}
