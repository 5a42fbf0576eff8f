//! Configuration for tender-core

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::CoreError;

/// Default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tender-core")
        .join("tender.db")
}

fn default_pool_size() -> u32 {
    8
}

/// Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Connection pool size (writes still serialize on the SQLite write lock)
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            pool_size: default_pool_size(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Internal(format!("Failed to read config {:?}: {}", path, e)))?;
        toml::from_str(&text)
            .map_err(|e| CoreError::InvalidInput(format!("Invalid config {:?}: {}", path, e)))
    }

    /// Load from a TOML file if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: &Path) -> Result<Self, CoreError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}
