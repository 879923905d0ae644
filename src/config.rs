//! Configuration for the logging engine
//!
//! The only setting is the host's private storage area. The logging root is
//! always the `logging` subdirectory beneath it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::directory::LOGGING_SUBDIR;

/// Environment variable that overrides the default storage directory
pub const STORAGE_DIR_ENV: &str = "LOGBOOK_STORAGE_DIR";

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Host storage area; `~` is expanded
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
        }
    }
}

impl Config {
    /// Configuration rooted at an explicit storage directory
    pub fn with_storage_dir(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: expand_path(&storage_dir.into()),
        }
    }

    /// Load configuration from the default file, or return default if not found
    pub fn load() -> Result<Self> {
        match config_file_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a TOML file, or return default if not found
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        let mut config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        config.storage_dir = expand_path(&config.storage_dir);
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Directory holding the destination files
    pub fn logging_root(&self) -> PathBuf {
        self.storage_dir.join(LOGGING_SUBDIR)
    }
}

/// Default storage directory
///
/// Uses `LOGBOOK_STORAGE_DIR` when set, then the platform's local data
/// directory, then `./.logbook`.
pub fn default_storage_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(STORAGE_DIR_ENV) {
        if !dir.trim().is_empty() {
            return expand_path(Path::new(&dir));
        }
    }

    dirs::data_local_dir()
        .map(|d| d.join("logbook"))
        .unwrap_or_else(|| {
            tracing::warn!("Could not determine data directory, using current directory for logs");
            PathBuf::from(".logbook")
        })
}

/// Path to the default config file (`<config dir>/logbook/config.toml`)
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("logbook").join("config.toml"))
}

fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(shellexpand::tilde(s).into_owned()),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_does_not_panic() {
        let config = Config::default();
        assert!(config.logging_root().ends_with("logging"));
    }

    #[test]
    fn test_tilde_is_expanded() {
        let config = Config::with_storage_dir("~/app-data");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(config.storage_dir, home.join("app-data"));
        }
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_from(&temp_dir.path().join("missing.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let config = Config::with_storage_dir(temp_dir.path().join("storage"));
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.logging_root(), temp_dir.path().join("storage").join("logging"));
    }

    #[test]
    fn test_load_rejects_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "storage_dir = [").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
