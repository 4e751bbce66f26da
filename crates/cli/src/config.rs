//! Locating and loading the intake config file

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use intake::IntakeConfig;

/// Default location, `~/.intake/config.toml`
pub fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".intake")
        .join("config.toml")
}

/// Load the config from `path` (or the default location) and apply command-line overrides.
pub fn load(path: Option<&Path>, database: Option<&str>) -> Result<IntakeConfig> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(config_path);

    let mut config = IntakeConfig::load(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;

    if let Some(url) = database {
        config.database.url = Some(url.to_string());
    }

    Ok(config)
}
