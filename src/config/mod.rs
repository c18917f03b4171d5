//! User configuration stored as JSON under the application directory.

use std::{
    env,
    path::{Path, PathBuf},
};

use dirs::home_dir;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{
    core::services::DEFAULT_MAX_PEOPLE,
    utils::persistence::{load_json, save_json_atomic, PersistenceError},
};

pub const HOME_ENV: &str = "PEOPLE_LEDGER_HOME";
const DEFAULT_DIR_NAME: &str = ".people_ledger";
const CONFIG_FILE: &str = "config.json";
const DATA_FILE: &str = "ledger.json";
const DEFAULT_ACCOUNT: &str = "local";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file error: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub account: String,
    pub max_people: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            account: DEFAULT_ACCOUNT.into(),
            max_people: DEFAULT_MAX_PEOPLE,
            log_filter: None,
        }
    }
}

impl Config {
    fn validate(self) -> Result<Self, ConfigError> {
        if self.account.trim().is_empty() {
            return Err(ConfigError::Invalid("account cannot be empty".into()));
        }
        if self.max_people == 0 {
            return Err(ConfigError::Invalid("max_people must be at least 1".into()));
        }
        Ok(self)
    }
}

/// Returns the application data directory: `$PEOPLE_LEDGER_HOME` or `~/.people_ledger`.
pub fn app_data_dir() -> PathBuf {
    if let Some(custom) = env::var_os(HOME_ENV) {
        return PathBuf::from(custom);
    }
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DIR_NAME)
}

pub struct ConfigManager {
    base: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::with_base_dir(app_data_dir())
    }

    pub fn with_base_dir(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    pub fn path(&self) -> PathBuf {
        self.base.join(CONFIG_FILE)
    }

    /// Location of the JSON document store.
    pub fn data_file(&self) -> PathBuf {
        self.base.join(DATA_FILE)
    }

    /// Loads the config, falling back to defaults when no file exists yet.
    pub fn load(&self) -> Result<Config, ConfigError> {
        let path = self.path();
        match load_json::<Config>(&path)? {
            Some(config) => config.validate(),
            None => {
                debug!(path = %path.display(), "no config file, using defaults");
                Ok(Config::default())
            }
        }
    }

    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let config = config.clone().validate()?;
        save_json_atomic(&config, &self.path())?;
        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
