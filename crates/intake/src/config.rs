//! Deployment configuration
//!
//! Loaded from TOML; every section has defaults so an empty file (or no file at all)
//! gives the reference intake flow.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{fields::IntakeScript, notification::NotificationConfig, prompts::Prompts};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Intake script has no fields")]
    EmptyScript,

    #[error("Duplicate field: {0}")]
    DuplicateField(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Invalid field: {0}")]
    InvalidField(String),

    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionConfig {
    /// Persist as soon as the last field is collected; otherwise wait for teardown
    #[serde(default = "default_true")]
    pub persist_on_finish: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            persist_on_finish: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// `sqlite://` URL; the asset directory database when unset
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntakeConfig {
    #[serde(default)]
    pub script: IntakeScript,
    #[serde(default)]
    pub prompts: Prompts,
    #[serde(default)]
    pub notification: NotificationConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

impl IntakeConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.script.validate()
    }
}
