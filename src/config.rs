use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    manager::DEFAULT_STORAGE_KEY, models::todo::IdPolicy, storage::json::DEFAULT_MAX_BACKUPS,
};

const APP_DIR: &str = "projdo";

/// Runtime settings. Every field has a default, so a partial file is fine.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// File holding the persisted key/value store
    pub data_file: PathBuf,

    /// Key under which the whole project state is stored
    pub storage_key: String,

    /// Number of previous data files kept in `backups/`
    pub max_backups: usize,

    /// Interval between re-renders in `watch` mode
    pub refresh_interval_secs: u64,

    /// Keep persisted todo ids on restore instead of generating new ones
    pub preserve_todo_ids: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config from '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config '{path}': {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            max_backups: DEFAULT_MAX_BACKUPS,
            refresh_interval_secs: 60,
            preserve_todo_ids: false,
        }
    }
}

impl Config {
    /// `<config dir>/projdo/config.json`, when the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.json"))
    }

    /// Loads the config at `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).map_err(|e| ConfigError::ParseFailed {
                path: path.to_path_buf(),
                source: e,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
            Err(e) => Err(ConfigError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    pub fn id_policy(&self) -> IdPolicy {
        if self.preserve_todo_ids {
            IdPolicy::Preserve
        } else {
            IdPolicy::Regenerate
        }
    }
}

fn default_data_file() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("store.json")
}
