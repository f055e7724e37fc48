use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::{FsError, FsErrorType, Result};
use crate::locations::get_config_path;

/// Session settings. Read from `config.json` in the platform config
/// directory; anything missing falls back to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The acting user for a new session. Also owns the root directory.
    pub user: String,
    pub log_retention_days: i64,
    pub log_to_file: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            user: "user".to_string(),
            log_retention_days: 30,
            log_to_file: true,
        }
    }
}

impl Config {
    pub fn load() -> Result<Config> {
        let path = get_config_path()?;
        Config::from_path(&path)
    }

    pub fn from_path(path: &Path) -> Result<Config> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Config::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Config::from_json(&contents).map_err(|e| e.context(path.display().to_string()))
    }

    pub fn from_json(contents: &str) -> Result<Config> {
        serde_json::from_str(contents).map_err(|e| {
            FsError::new(
                FsErrorType::InvalidArgument,
                format!("invalid config: {}", e),
            )
        })
    }

    /// Apply command line overrides on top of the file settings.
    pub fn with_user(mut self, user: Option<String>) -> Config {
        if let Some(user) = user {
            self.user = user;
        }
        self
    }
}
