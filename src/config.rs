//! Configuration loading and management
//!
//! Handles parsing of `teamdeck.toml` configuration files.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name inside a data directory
pub const CONFIG_FILE: &str = "teamdeck.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Capacity ceilings for aggregates
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Notification delivery configuration
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

impl Config {
    /// Load configuration from a data directory, falling back to defaults
    /// when no config file is present.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.limits.max_columns == 0 {
            return Err(Error::InvalidConfig(
                "limits.max_columns must be at least 1".to_string(),
            ));
        }
        if self.limits.max_members == 0 {
            return Err(Error::InvalidConfig(
                "limits.max_members must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Capacity ceilings enforced by the aggregate managers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Members per board or roadmap (the owner counts as a member)
    #[serde(default = "default_max_members")]
    pub max_members: usize,

    /// Columns per board
    #[serde(default = "default_max_columns")]
    pub max_columns: usize,

    /// Tasks per board column
    #[serde(default = "default_max_tasks_per_column")]
    pub max_tasks_per_column: usize,

    /// Assignees per board task
    #[serde(default = "default_max_assignees")]
    pub max_assignees: usize,

    /// Tag references per board task
    #[serde(default = "default_max_tags_per_task")]
    pub max_tags_per_task: usize,

    /// Quarters per roadmap
    #[serde(default = "default_max_quarters")]
    pub max_quarters: usize,

    /// Milestones per roadmap
    #[serde(default = "default_max_milestones")]
    pub max_milestones: usize,

    /// Category rows per roadmap
    #[serde(default = "default_max_categories")]
    pub max_categories: usize,

    /// Rows per roadmap category
    #[serde(default = "default_max_rows_per_category")]
    pub max_rows_per_category: usize,

    /// Tasks per roadmap row
    #[serde(default = "default_max_tasks_per_row")]
    pub max_tasks_per_row: usize,
}

fn default_max_members() -> usize {
    100
}

fn default_max_columns() -> usize {
    20
}

fn default_max_tasks_per_column() -> usize {
    500
}

fn default_max_assignees() -> usize {
    10
}

fn default_max_tags_per_task() -> usize {
    100
}

fn default_max_quarters() -> usize {
    12
}

fn default_max_milestones() -> usize {
    50
}

fn default_max_categories() -> usize {
    50
}

fn default_max_rows_per_category() -> usize {
    100
}

fn default_max_tasks_per_row() -> usize {
    500
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_members: default_max_members(),
            max_columns: default_max_columns(),
            max_tasks_per_column: default_max_tasks_per_column(),
            max_assignees: default_max_assignees(),
            max_tags_per_task: default_max_tags_per_task(),
            max_quarters: default_max_quarters(),
            max_milestones: default_max_milestones(),
            max_categories: default_max_categories(),
            max_rows_per_category: default_max_rows_per_category(),
            max_tasks_per_row: default_max_tasks_per_row(),
        }
    }
}

/// Notification-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Event name used for realtime pushes
    #[serde(default = "default_push_event")]
    pub push_event: String,
}

fn default_push_event() -> String {
    "notification".to_string()
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            push_event: default_push_event(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_ceilings() {
        let config = Config::default();
        assert_eq!(config.limits.max_members, 100);
        assert_eq!(config.limits.max_columns, 20);
        assert_eq!(config.limits.max_tasks_per_column, 500);
        assert_eq!(config.limits.max_assignees, 10);
        assert_eq!(config.limits.max_tags_per_task, 100);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: Config = toml::from_str("[limits]\nmax_columns = 5\n").unwrap();
        assert_eq!(config.limits.max_columns, 5);
        assert_eq!(config.limits.max_members, 100);
        assert_eq!(config.notifications.push_event, "notification");
    }

    #[test]
    fn load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.limits.max_tasks_per_column, 500);
    }

    #[test]
    fn zero_column_ceiling_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[limits]\nmax_columns = 0\n",
        )
        .unwrap();
        let err = Config::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
