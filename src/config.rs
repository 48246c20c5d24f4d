//! Layout and fetch configuration
//!
//! Configuration is stored as TOML, by default in
//! `~/.config/promise-tree/config.toml`, and controls the fixed geometry
//! used by the timeline and graph layouts and the search page size.
//! Every section is optional; missing values fall back to the defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::graph::Direction;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Timeline bar geometry
    #[serde(default)]
    pub timeline: TimelineConfig,

    /// Dependency graph geometry
    #[serde(default)]
    pub graph: GraphConfig,

    /// Paginated search settings
    #[serde(default)]
    pub fetch: FetchConfig,
}

/// Timeline bar geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineConfig {
    /// Height of a single bar
    #[serde(default = "default_bar_height")]
    pub bar_height: f64,

    /// Vertical gap between lanes
    #[serde(default = "default_bar_spacing")]
    pub bar_spacing: f64,
}

fn default_bar_height() -> f64 {
    24.0
}

fn default_bar_spacing() -> f64 {
    4.0
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            bar_height: default_bar_height(),
            bar_spacing: default_bar_spacing(),
        }
    }
}

/// Dependency graph geometry handed to the layout oracle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// "TB" (top to bottom) or "LR" (left to right)
    #[serde(default)]
    pub direction: Direction,

    /// Abstract width of every node
    #[serde(default = "default_node_width")]
    pub node_width: f64,

    /// Abstract height of every node
    #[serde(default = "default_node_height")]
    pub node_height: f64,

    /// Gap between consecutive levels
    #[serde(default = "default_rank_sep")]
    pub rank_sep: f64,

    /// Gap between nodes on the same level
    #[serde(default = "default_node_sep")]
    pub node_sep: f64,
}

fn default_node_width() -> f64 {
    220.0
}

fn default_node_height() -> f64 {
    72.0
}

fn default_rank_sep() -> f64 {
    80.0
}

fn default_node_sep() -> f64 {
    40.0
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            direction: Direction::default(),
            node_width: default_node_width(),
            node_height: default_node_height(),
            rank_sep: default_rank_sep(),
            node_sep: default_node_sep(),
        }
    }
}

/// Paginated search settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Records requested per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_size() -> usize {
    100
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

impl Config {
    /// Path of the per-user config file
    pub fn global_path() -> anyhow::Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("promise-tree").join("config.toml"))
    }

    /// Load configuration from `path`.
    /// Returns default config if the file doesn't exist
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config: {}", e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))?;

        Ok(config)
    }

    /// Load from an explicit path, or from the global path when none is given.
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                Self::load(path)
            }
            None => match Self::global_path() {
                Ok(global) => Self::load(&global),
                Err(_) => Ok(Self::default()),
            },
        }
    }

    /// Save configuration to `path`, creating parent directories
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| anyhow::anyhow!("Failed to create config directory: {}", e))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;

        fs::write(path, content).map_err(|e| anyhow::anyhow!("Failed to write config: {}", e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.timeline.bar_height, 24.0);
        assert_eq!(config.timeline.bar_spacing, 4.0);
        assert_eq!(config.graph.direction, Direction::TopBottom);
        assert_eq!(config.fetch.page_size, 100);
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
[graph]
direction = "LR"
node_width = 180

[fetch]
page_size = 25
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.graph.direction, Direction::LeftRight);
        assert_eq!(config.graph.node_width, 180.0);
        assert_eq!(config.graph.node_height, 72.0);
        assert_eq!(config.fetch.page_size, 25);
        assert_eq!(config.timeline, TimelineConfig::default());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.timeline.bar_height = 30.0;
        config.graph.direction = Direction::LeftRight;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file_gives_default() {
        let temp_dir = TempDir::new().unwrap();
        let loaded = Config::load(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_explicit_missing_path_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("absent.toml");
        assert!(Config::load_or_default(Some(&missing)).is_err());
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[graph\nnode_width = ").unwrap();
        assert!(Config::load(&path).is_err());
    }
}
