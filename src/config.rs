//! Configuration for learnplaces

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::LearnplaceError;
use crate::model::Visibility;

/// Default storage directory
pub fn default_storage_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("learnplaces")
}

/// Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Storage directory for the database and config file
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// SQLite database file name inside `storage_dir`
    #[serde(default = "default_database_file")]
    pub database_file: String,

    /// Visibility given to new blocks when a learnplace has no configuration
    #[serde(default)]
    pub default_visibility: Visibility,

    /// Whether new learnplaces start online
    #[serde(default)]
    pub default_online: bool,

    /// Map zoom level for new learnplaces (1..=20)
    #[serde(default = "default_map_zoom_level")]
    pub default_map_zoom_level: u8,

    /// Whether users may zoom the map of new learnplaces
    #[serde(default = "default_true")]
    pub default_map_zoom: bool,

    /// Radius in meters used when a learnplace is created without one
    #[serde(default = "default_radius")]
    pub default_radius: u32,
}

fn default_database_file() -> String {
    "learnplaces.db".to_string()
}

fn default_map_zoom_level() -> u8 {
    7
}

fn default_true() -> bool {
    true
}

fn default_radius() -> u32 {
    100
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            database_file: default_database_file(),
            default_visibility: Visibility::default(),
            default_online: false,
            default_map_zoom_level: default_map_zoom_level(),
            default_map_zoom: true,
            default_radius: default_radius(),
        }
    }
}

impl Config {
    /// Load config from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LearnplaceError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&content).map_err(|e| LearnplaceError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), LearnplaceError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| LearnplaceError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<(), LearnplaceError> {
        if !(1..=20).contains(&self.default_map_zoom_level) {
            return Err(LearnplaceError::Config(format!(
                "default_map_zoom_level must be within 1..=20, got {}",
                self.default_map_zoom_level
            )));
        }
        if self.database_file.is_empty() {
            return Err(LearnplaceError::Config("database_file is empty".into()));
        }
        Ok(())
    }

    /// Get database path
    pub fn database_path(&self) -> PathBuf {
        self.storage_dir.join(&self.database_file)
    }

    /// Get config file path
    pub fn config_path(&self) -> PathBuf {
        self.storage_dir.join("config.toml")
    }
}
