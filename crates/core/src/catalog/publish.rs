use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ValidationError;
use super::types::{App, Release, MANUAL_PUBLISHER, STATUS_SUCCESS, UNSPECIFIED_VERSION};

/// Who published a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Publisher {
    /// An admin publishing without a token.
    Manual,
    /// A client authenticated by a token.
    Token { id: String, name: String },
}

impl Publisher {
    /// The name snapshot stored on each release.
    pub fn name(&self) -> &str {
        match self {
            Publisher::Manual => MANUAL_PUBLISHER,
            Publisher::Token { name, .. } => name,
        }
    }

    /// The token reference stored on each release, `None` for manual publishes.
    pub fn token_id(&self) -> Option<&str> {
        match self {
            Publisher::Manual => None,
            Publisher::Token { id, .. } => Some(id),
        }
    }
}

/// A file already written to the uploads directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    /// Sanitized name the client uploaded.
    pub original_name: String,
    /// Unique name in the uploads directory.
    pub stored_name: String,
    pub size: u64,
}

/// One publish request: several files sharing app, version and publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishBatch {
    pub app_id: String,
    pub app_name: String,
    pub version: Option<String>,
    pub description: Option<String>,
    pub publisher: Publisher,
    pub files: Vec<UploadedFile>,
}

impl PublishBatch {
    /// Starts a batch for `app`, snapshotting its current name.
    pub fn new(app: &App, publisher: Publisher) -> Self {
        Self {
            app_id: app.app_id.clone(),
            app_name: app.name.clone(),
            version: None,
            description: None,
            publisher,
            files: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_file(mut self, file: UploadedFile) -> Self {
        self.files.push(file);
        self
    }

    /// Builds one release record per file, all stamped with `uploaded_at`.
    ///
    /// A missing or blank version becomes [`UNSPECIFIED_VERSION`]; a blank
    /// description is dropped.
    pub fn into_releases(self, uploaded_at: DateTime<Utc>) -> Result<Vec<Release>, ValidationError> {
        if self.files.is_empty() {
            return Err(ValidationError::NoFiles);
        }

        let version = self
            .version
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| UNSPECIFIED_VERSION.to_string());
        let description = self.description.filter(|d| !d.trim().is_empty());
        let token_name = self.publisher.name().to_string();
        let token_id = self.publisher.token_id().map(str::to_string);

        Ok(self
            .files
            .into_iter()
            .map(|file| Release {
                id: Uuid::new_v4().to_string(),
                app_id: self.app_id.clone(),
                app_name: self.app_name.clone(),
                version: version.clone(),
                description: description.clone(),
                file_name: file.original_name,
                file_path: file.stored_name,
                file_size: file.size,
                token_name: token_name.clone(),
                token_id: token_id.clone(),
                uploaded_at,
                status: Some(STATUS_SUCCESS.to_string()),
                download_count: 0,
                updated_at: None,
            })
            .collect())
    }
}
