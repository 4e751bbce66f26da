use std::{
    env,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;

const PROJECT_ROOT: &str = env!("CARGO_MANIFEST_DIR");
const ASSET_DIR_ENV: &str = "INTAKE_ASSET_DIR";
const DATABASE_FILE: &str = "intake.sqlite";

/// Directory holding the intake database and any other runtime state.
///
/// `INTAKE_ASSET_DIR` wins when set. Debug builds fall back to `dev_assets/` at the
/// workspace root, release builds to the platform data directory.
pub fn asset_dir() -> PathBuf {
    let path = if let Ok(custom_dir) = env::var(ASSET_DIR_ENV) {
        PathBuf::from(custom_dir)
    } else if cfg!(debug_assertions) {
        PathBuf::from(PROJECT_ROOT).join("../../dev_assets")
    } else {
        match ProjectDirs::from("ai", "intake", "phone-intake") {
            Some(dirs) => dirs.data_dir().to_path_buf(),
            None => {
                tracing::warn!("No home directory available, using ./intake-data");
                PathBuf::from("intake-data")
            }
        }
    };

    if !path.exists() {
        if let Err(e) = std::fs::create_dir_all(&path) {
            tracing::warn!("Failed to create asset directory {}: {}", path.display(), e);
        }
    }

    path
}

/// Location of the default SQLite database file.
pub fn database_path() -> PathBuf {
    database_path_in(&asset_dir())
}

/// `sqlite://` URL for the default database file.
pub fn database_url() -> String {
    database_url_for(&database_path())
}

fn database_path_in(dir: &Path) -> PathBuf {
    dir.join(DATABASE_FILE)
}

fn database_url_for(path: &Path) -> String {
    format!("sqlite://{}", path.to_string_lossy())
}
