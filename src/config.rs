//! Layered daemon configuration.
//!
//! Sources, highest priority first:
//! 1. Environment variables (`SCHOOLD_*`, `__` separates sections)
//! 2. `schoold.toml` in the working directory
//! 3. Built-in defaults
//!
//! `SCHOOLD_STORAGE__WORKSPACE=/data/school` maps to `storage.workspace`.
//! `SCHOOLD_LOG` is a tracing filter, not a config key, and is skipped here.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_FILE: &str = "schoold.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Figment extraction or merge error.
    #[error("Configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        Self::Figment(Box::new(e))
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Workspace directory holding `school.sqlite3`. Absent means in-memory.
    #[serde(default)]
    pub workspace: Option<PathBuf>,

    /// Byte limit for the in-memory backend.
    #[serde(default)]
    pub quota_bytes: Option<usize>,
}

fn default_level() -> String {
    "warn".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ExportConfig {
    /// Directory exports land in when a request names no destination.
    #[serde(default)]
    pub out_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SchoolConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

impl SchoolConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        let local = PathBuf::from(CONFIG_FILE);
        if local.exists() {
            figment = figment.merge(Toml::file(local));
        }
        figment.merge(Env::prefixed("SCHOOLD_").ignore(&["log"]).split("__"))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.quota_bytes == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "storage.quota_bytes".into(),
                reason: "must be greater than zero".into(),
            });
        }
        if tracing_subscriber::EnvFilter::try_new(&self.log.level).is_err() {
            return Err(ConfigError::InvalidValue {
                field: "log.level".into(),
                reason: format!("not a tracing filter: {}", self.log.level),
            });
        }
        Ok(())
    }
}
