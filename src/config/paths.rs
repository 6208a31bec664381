//! Platform-specific configuration and data paths.

use crate::constants::{APP_NAME, DEFAULT_STORE_FILE};
use crate::error::{Error, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", APP_NAME).ok_or(Error::ConfigDirNotFound)
}

/// Get the configuration directory for the current platform.
///
/// - Linux: `~/.config/tusker/`
/// - macOS: `~/Library/Application Support/tusker/`
/// - Windows: `%APPDATA%\tusker\`
pub fn config_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().to_path_buf())
}

/// Get the full path to the config file.
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Store snapshot path used when none is configured.
pub fn default_store_path() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().join(DEFAULT_STORE_FILE))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_returns_path() {
        let path = config_dir().unwrap();
        assert!(path.to_string_lossy().contains("tusker"));
    }

    #[test]
    fn test_config_file_path_ends_with_toml() {
        let path = config_file_path().unwrap();
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn test_default_store_path_is_json() {
        let path = default_store_path().unwrap();
        assert!(path.to_string_lossy().ends_with("store.json"));
    }
}
