//! Storage configuration (pure data).
//!
//! The loader in the `fileupdate` crate reads the override file; everything
//! here is side-effect free.

mod merge;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use merge::merge;

/// Which storage backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Driver {
    Json,
    Sqlite,
}

impl Driver {
    pub fn as_str(&self) -> &'static str {
        match self {
            Driver::Json => "json",
            Driver::Sqlite => "sqlite",
        }
    }
}

impl From<String> for Driver {
    /// `sqlite` in any case selects SQLite; every other name selects JSON.
    fn from(name: String) -> Self {
        if name.trim().eq_ignore_ascii_case("sqlite") {
            Driver::Sqlite
        } else {
            Driver::Json
        }
    }
}

impl From<Driver> for String {
    fn from(driver: Driver) -> Self {
        driver.as_str().to_string()
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of the JSON backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonConfig {
    /// Directory holding `apps.json`, `tokens.json` and `releases.json`.
    pub base_dir: PathBuf,
}

/// Parameters of the SQLite backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqliteConfig {
    /// Database file.
    pub filename: PathBuf,
    /// Engine knobs applied at startup, best-effort (`PRAGMA key = value`).
    #[serde(default)]
    pub pragma: BTreeMap<String, serde_json::Value>,
}

/// Complete storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub driver: Driver,
    pub sqlite: SqliteConfig,
    pub json: JsonConfig,
}

impl StorageConfig {
    /// The built-in defaults for a deployment rooted at `root`.
    ///
    /// JSON driver with data files in `root`; SQLite database at
    /// `root/data/fileupdate.sqlite` in WAL mode with normal sync.
    pub fn defaults_for(root: &Path) -> Self {
        let mut pragma = BTreeMap::new();
        pragma.insert("journal_mode".to_string(), serde_json::json!("wal"));
        pragma.insert("synchronous".to_string(), serde_json::json!("normal"));

        Self {
            driver: Driver::Json,
            sqlite: SqliteConfig {
                filename: root.join("data").join("fileupdate.sqlite"),
                pragma,
            },
            json: JsonConfig {
                base_dir: root.to_path_buf(),
            },
        }
    }

    /// Makes relative paths absolute by joining them onto `root`.
    pub fn resolve_paths(mut self, root: &Path) -> Self {
        if self.sqlite.filename.is_relative() {
            self.sqlite.filename = root.join(&self.sqlite.filename);
        }
        if self.json.base_dir.is_relative() {
            self.json.base_dir = root.join(&self.json.base_dir);
        }
        self
    }
}
