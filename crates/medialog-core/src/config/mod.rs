//! Configuration and library path resolution

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Configuration for medialog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Directory holding one folder per record
    pub library_path: PathBuf,
    /// Scratch directory used while importing; emptied per batch
    pub staging_path: PathBuf,
    /// Default destination for exported archives and workbooks
    pub export_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let base = data_dir();
        Self {
            library_path: base.join("library"),
            staging_path: base.join("staging"),
            export_path: dirs::document_dir()
                .or_else(dirs::home_dir)
                .unwrap_or_else(|| base.clone()),
        }
    }
}

impl Config {
    /// Create a config rooted at a single directory (useful for tests and portable installs)
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            library_path: root.join("library"),
            staging_path: root.join("staging"),
            export_path: root.join("exports"),
        }
    }

    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("medialog").join("config.json"))
    }

    /// Load config from the default location.
    ///
    /// A missing file yields the defaults; an unreadable or malformed file is
    /// an error, since every path the library touches comes from here.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load config from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| Error::ConfigReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        serde_json::from_str(&content).map_err(|e| Error::ConfigReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        match Self::config_path() {
            Some(path) => self.save_to(&path),
            None => Err(Error::ConfigWriteFailed {
                path: PathBuf::from("config.json"),
                reason: "no configuration directory on this platform".to_string(),
            }),
        }
    }

    /// Save config to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let write_failed = |reason: String| Error::ConfigWriteFailed {
            path: path.to_path_buf(),
            reason,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| write_failed(e.to_string()))?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|e| write_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| write_failed(e.to_string()))
    }

    /// Make sure the library and staging directories exist
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.library_path)?;
        std::fs::create_dir_all(&self.staging_path)?;
        Ok(())
    }
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join("medialog"))
        .unwrap_or_else(|| PathBuf::from(".medialog"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_config_uses_defaults() {
        let temp = tempdir().unwrap();
        let config = Config::load_from(&temp.path().join("nope.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("medialog").join("config.json");
        let config = Config::rooted_at(temp.path());

        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::ConfigReadFailed { .. }));
    }
}
