//! CLI configuration and on-disk layout.
//!
//! Configuration lives in a JSON file under the base directory
//! (`~/.wedding-guest` by default), with environment variables taking
//! precedence over the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine home directory")]
    NoHomeDir,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Filesystem layout for config and stored credentials.
#[derive(Debug, Clone)]
pub struct Paths {
    pub base_dir: PathBuf,
}

impl Paths {
    pub fn new() -> Result<Self, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(Self {
            base_dir: home.join(".wedding-guest"),
        })
    }

    /// Root the layout at an explicit directory, for `--base-dir` and tests.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    pub fn storage_file(&self) -> PathBuf {
        self.base_dir.join("storage.json")
    }

    pub fn ensure_dirs(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.base_dir)?;
        Ok(())
    }
}

/// User-editable settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the wedding backend, including the `/api` prefix.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Local port the OAuth redirect listener binds to.
    #[serde(default = "default_callback_port")]
    pub oauth_callback_port: u16,
}

fn default_api_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_callback_port() -> u16 {
    guest_session::DEFAULT_CALLBACK_PORT
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            log_level: default_log_level(),
            oauth_callback_port: default_callback_port(),
        }
    }
}

impl Config {
    /// Load from the config file, falling back to defaults when the file is
    /// missing or unreadable. Environment overrides are applied afterwards.
    pub fn load(paths: &Paths) -> Self {
        let mut config = match Self::read_file(&paths.config_file()) {
            Ok(Some(config)) => config,
            Ok(None) => Self::default(),
            Err(e) => {
                warn!("Failed to read config file, using defaults: {}", e);
                Self::default()
            }
        };
        config.apply_env();
        config
    }

    fn read_file(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&contents)?;
        debug!(path = %path.display(), "Loaded config");
        Ok(Some(config))
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("WEDDING_API_URL") {
            if !url.is_empty() {
                self.api_url = url;
            }
        }
        if let Ok(level) = std::env::var("WEDDING_LOG_LEVEL") {
            if !level.is_empty() {
                self.log_level = level;
            }
        }
    }

    pub fn save(&self, paths: &Paths) -> Result<(), ConfigError> {
        paths.ensure_dirs()?;
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path());
        let config = Config::load(&paths);
        assert_eq!(config.api_url, "http://localhost:8000/api");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.oauth_callback_port, guest_session::DEFAULT_CALLBACK_PORT);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path());

        let config = Config {
            api_url: "https://wedding.example.com/api".to_string(),
            log_level: "debug".to_string(),
            oauth_callback_port: 9000,
        };
        config.save(&paths).unwrap();

        let loaded = Config::load(&paths);
        assert_eq!(loaded.api_url, "https://wedding.example.com/api");
        assert_eq!(loaded.log_level, "debug");
        assert_eq!(loaded.oauth_callback_port, 9000);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path());
        std::fs::create_dir_all(dir.path()).unwrap();
        std::fs::write(
            paths.config_file(),
            r#"{"api_url": "https://wedding.example.com/api"}"#,
        )
        .unwrap();

        let config = Config::load(&paths);
        assert_eq!(config.api_url, "https://wedding.example.com/api");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path());
        std::fs::create_dir_all(dir.path()).unwrap();
        std::fs::write(paths.config_file(), "not json").unwrap();

        let config = Config::load(&paths);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_layout_under_base_dir() {
        let paths = Paths::with_base_dir("/tmp/wg-test");
        assert_eq!(paths.config_file(), PathBuf::from("/tmp/wg-test/config.json"));
        assert_eq!(paths.storage_file(), PathBuf::from("/tmp/wg-test/storage.json"));
    }
}
