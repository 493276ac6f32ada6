//! Configuration loading.
//!
//! The built-in defaults (see [`StorageConfig::defaults_for`]) are merged
//! with an optional JSON override file. A missing override file is fine; an
//! unreadable or malformed one is an error.

use std::io;
use std::path::{Path, PathBuf};

use fileupdate_core::config::{merge, StorageConfig};
use thiserror::Error;

/// Override file location, relative to the deployment root.
pub const OVERRIDE_FILE: &str = "config/database.json";

/// Directory (relative to the root) that holds uploaded artifacts.
pub const UPLOADS_DIR: &str = "uploads";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("config file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid storage configuration: {0}")]
    Invalid(#[source] serde_json::Error),
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Deployment root; relative paths resolve against it.
    pub root: PathBuf,
    /// Backend selection and parameters.
    pub storage: StorageConfig,
    /// Where uploaded artifacts live.
    pub uploads_dir: PathBuf,
}

impl Config {
    /// Loads configuration for the deployment rooted at `root`.
    ///
    /// `override_path` defaults to `root/config/database.json`.
    pub fn load(root: &Path, override_path: Option<&Path>) -> Result<Self, ConfigError> {
        let override_path = override_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| root.join(OVERRIDE_FILE));

        let defaults = StorageConfig::defaults_for(root);
        let mut value = serde_json::to_value(&defaults).map_err(ConfigError::Invalid)?;

        match read_override(&override_path)? {
            Some(overlay) => {
                tracing::debug!(path = %override_path.display(), "Applying config override");
                value = merge(value, overlay);
            }
            None => {
                tracing::debug!(path = %override_path.display(), "No config override found");
            }
        }

        let storage: StorageConfig =
            serde_json::from_value(value).map_err(ConfigError::Invalid)?;

        Ok(Self {
            root: root.to_path_buf(),
            storage: storage.resolve_paths(root),
            uploads_dir: root.join(UPLOADS_DIR),
        })
    }
}

fn read_override(path: &Path) -> Result<Option<serde_json::Value>, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fileupdate_core::config::Driver;

    fn write_override(root: &Path, contents: &str) {
        let path = root.join(OVERRIDE_FILE);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_defaults_without_override() {
        let dir = tempfile::tempdir().unwrap();

        let config = Config::load(dir.path(), None).unwrap();

        assert_eq!(config.storage.driver, Driver::Json);
        assert_eq!(config.storage.json.base_dir, dir.path());
        assert_eq!(
            config.storage.sqlite.filename,
            dir.path().join("data").join("fileupdate.sqlite")
        );
        assert_eq!(config.uploads_dir, dir.path().join("uploads"));
    }

    #[test]
    fn test_override_merges_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        write_override(
            dir.path(),
            r#"{"driver": "SQLite", "sqlite": {"pragma": {"synchronous": "full"}}}"#,
        );

        let config = Config::load(dir.path(), None).unwrap();

        assert_eq!(config.storage.driver, Driver::Sqlite);
        assert_eq!(config.storage.sqlite.pragma["synchronous"], "full");
        assert_eq!(config.storage.sqlite.pragma["journal_mode"], "wal");
        assert_eq!(
            config.storage.sqlite.filename,
            dir.path().join("data").join("fileupdate.sqlite")
        );
    }

    #[test]
    fn test_relative_override_paths_resolve_against_root() {
        let dir = tempfile::tempdir().unwrap();
        write_override(
            dir.path(),
            r#"{"sqlite": {"filename": "db/releases.sqlite"}, "json": {"baseDir": "state"}}"#,
        );

        let config = Config::load(dir.path(), None).unwrap();

        assert_eq!(
            config.storage.sqlite.filename,
            dir.path().join("db").join("releases.sqlite")
        );
        assert_eq!(config.storage.json.base_dir, dir.path().join("state"));
    }

    #[test]
    fn test_explicit_override_path() {
        let dir = tempfile::tempdir().unwrap();
        let custom = dir.path().join("custom.json");
        std::fs::write(&custom, r#"{"driver": "sqlite"}"#).unwrap();

        let config = Config::load(dir.path(), Some(&custom)).unwrap();

        assert_eq!(config.storage.driver, Driver::Sqlite);
    }

    #[test]
    fn test_malformed_override_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_override(dir.path(), "{ not json");

        let result = Config::load(dir.path(), None);

        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_override_with_wrong_shape_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        write_override(dir.path(), r#"{"json": {"baseDir": 42}}"#);

        let result = Config::load(dir.path(), None);

        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
