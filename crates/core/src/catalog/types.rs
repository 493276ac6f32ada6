use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock;

use super::publish::Publisher;

/// Status written on every published release.
pub const STATUS_SUCCESS: &str = "success";

/// Version recorded when a publish does not name one.
pub const UNSPECIFIED_VERSION: &str = "unspecified";

/// Publisher name recorded for admin-originated manual publishes.
pub const MANUAL_PUBLISHER: &str = "manual";

/// Manual publisher name found in records written by earlier deployments.
pub const LEGACY_MANUAL_PUBLISHER: &str = "手动发布";

fn default_version() -> String {
    UNSPECIFIED_VERSION.to_string()
}

/// A named distributable product that accumulates releases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct App {
    /// Primary identity, immutable after creation.
    pub app_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Records without one read as the Unix epoch.
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

impl App {
    /// Creates a new app stamped with the current time.
    pub fn new(app_id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = clock::now();
        Self {
            app_id: app_id.into(),
            name: name.into(),
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the description for this app.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets both timestamps (useful for testing).
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self.updated_at = created_at;
        self
    }
}

/// Fields of an [`App`] that may be changed after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl AppPatch {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Merges the provided fields into `app` and refreshes `updated_at`.
    ///
    /// `updated_at` moves even when no field is provided.
    pub fn apply(&self, app: &mut App, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            app.name = name.clone();
        }
        if let Some(description) = &self.description {
            app.description = Some(description.clone());
        }
        app.updated_at = now;
    }
}

/// A bearer credential granting non-admin publish access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub id: String,
    /// The credential itself. Opaque to storage.
    pub token: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_used: Option<DateTime<Utc>>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub usage_count: u64,
}

fn default_active() -> bool {
    true
}

impl Token {
    /// Creates an active, unused token with a fresh id.
    pub fn new(credential: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            token: credential.into(),
            name: name.into(),
            description: None,
            created_at: clock::now(),
            last_used: None,
            active: true,
            usage_count: 0,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets a specific ID for this token (useful for testing).
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// The credential shortened for display: the first 20 characters and an ellipsis.
    pub fn masked_credential(&self) -> String {
        let prefix: String = self.token.chars().take(20).collect();
        format!("{prefix}...")
    }
}

/// One uploaded artifact tied to an app, version and publisher.
///
/// `app_name` and `token_name` are snapshots taken at publish time and are
/// not kept in sync with later renames.
///
/// Only `id` and `uploaded_at` are required when reading stored records;
/// releases from before apps existed carry no `app_id` and read with an
/// empty one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub id: String,
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub app_name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Original (sanitized) upload name.
    #[serde(default)]
    pub file_name: String,
    /// Name of the stored artifact in the uploads directory.
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub token_name: String,
    #[serde(default)]
    pub token_id: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    /// `None` is treated as [`STATUS_SUCCESS`].
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub download_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Release {
    /// Creates a successful manual release of a single file.
    ///
    /// The stored path defaults to the file name and the size to zero.
    pub fn new(
        app_id: impl Into<String>,
        app_name: impl Into<String>,
        file_name: impl Into<String>,
        uploaded_at: DateTime<Utc>,
    ) -> Self {
        let file_name = file_name.into();
        Self {
            id: Uuid::new_v4().to_string(),
            app_id: app_id.into(),
            app_name: app_name.into(),
            version: UNSPECIFIED_VERSION.to_string(),
            description: None,
            file_path: file_name.clone(),
            file_name,
            file_size: 0,
            token_name: MANUAL_PUBLISHER.to_string(),
            token_id: None,
            uploaded_at,
            status: Some(STATUS_SUCCESS.to_string()),
            download_count: 0,
            updated_at: None,
        }
    }

    /// Sets a specific ID for this release (useful for testing).
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_file(mut self, file_path: impl Into<String>, file_size: u64) -> Self {
        self.file_path = file_path.into();
        self.file_size = file_size;
        self
    }

    pub fn with_publisher(mut self, publisher: &Publisher) -> Self {
        self.token_name = publisher.name().to_string();
        self.token_id = publisher.token_id().map(str::to_string);
        self
    }

    pub fn with_status(mut self, status: Option<&str>) -> Self {
        self.status = status.map(str::to_string);
        self
    }

    /// The status used for filtering: an unset status counts as success.
    pub fn effective_status(&self) -> &str {
        self.status.as_deref().unwrap_or(STATUS_SUCCESS)
    }

    /// Returns true if this release counts as successfully published.
    pub fn is_success(&self) -> bool {
        self.effective_status() == STATUS_SUCCESS
    }

    /// Returns true if an admin published this release without a token.
    ///
    /// Accepts both [`MANUAL_PUBLISHER`] and [`LEGACY_MANUAL_PUBLISHER`].
    pub fn is_manual(&self) -> bool {
        self.token_id.is_none()
            && (self.token_name == MANUAL_PUBLISHER || self.token_name == LEGACY_MANUAL_PUBLISHER)
    }
}

/// Fields of a [`Release`] an admin may edit after publishing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleasePatch {
    pub version: Option<String>,
    pub description: Option<String>,
}

impl ReleasePatch {
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns true if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.version.is_none() && self.description.is_none()
    }

    /// Merges the provided fields into `release` and stamps `updated_at`.
    pub fn apply(&self, release: &mut Release, now: DateTime<Utc>) {
        if let Some(version) = &self.version {
            release.version = version.clone();
        }
        if let Some(description) = &self.description {
            release.description = Some(description.clone());
        }
        release.updated_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::parse_timestamp;

    fn ts(s: &str) -> DateTime<Utc> {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn test_app_new_sets_equal_timestamps() {
        let app = App::new("demo", "Demo");
        assert_eq!(app.created_at, app.updated_at);
        assert_eq!(app.description, None);
    }

    #[test]
    fn test_app_patch_merges_only_provided_fields() {
        let mut app = App::new("demo", "Demo")
            .with_description("first")
            .with_created_at(ts("2024-01-01T00:00:00Z"));
        let now = ts("2024-02-01T00:00:00Z");

        AppPatch::default().name("Renamed").apply(&mut app, now);

        assert_eq!(app.name, "Renamed");
        assert_eq!(app.description.as_deref(), Some("first"));
        assert_eq!(app.updated_at, now);
        assert_eq!(app.created_at, ts("2024-01-01T00:00:00Z"));
    }

    #[test]
    fn test_empty_app_patch_still_refreshes_updated_at() {
        let mut app = App::new("demo", "Demo").with_created_at(ts("2024-01-01T00:00:00Z"));
        let now = ts("2024-03-01T00:00:00Z");

        AppPatch::default().apply(&mut app, now);

        assert_eq!(app.name, "Demo");
        assert_eq!(app.updated_at, now);
    }

    #[test]
    fn test_token_defaults() {
        let token = Token::new("abc", "ci");
        assert!(token.active);
        assert_eq!(token.usage_count, 0);
        assert_eq!(token.last_used, None);
        assert!(Uuid::parse_str(&token.id).is_ok());
    }

    #[test]
    fn test_masked_credential() {
        let token = Token::new("abcdefghijklmnopqrstuvwxyz", "ci");
        assert_eq!(token.masked_credential(), "abcdefghijklmnopqrst...");

        let short = Token::new("abc", "ci");
        assert_eq!(short.masked_credential(), "abc...");
    }

    #[test]
    fn test_token_deserializes_with_missing_optional_fields() {
        let json = r#"{
            "id": "t1",
            "token": "abc",
            "name": "ci",
            "createdAt": "2024-01-01T00:00:00.000Z"
        }"#;
        let token: Token = serde_json::from_str(json).unwrap();
        assert!(token.active);
        assert_eq!(token.usage_count, 0);
        assert_eq!(token.last_used, None);
        assert_eq!(token.description, None);
    }

    #[test]
    fn test_release_uses_camel_case_keys() {
        let release = Release::new("demo", "Demo", "a.zip", ts("2024-01-01T00:00:00Z"))
            .with_id("r1");
        let value = serde_json::to_value(&release).unwrap();

        assert_eq!(value["appId"], "demo");
        assert_eq!(value["fileName"], "a.zip");
        assert_eq!(value["downloadCount"], 0);
        assert_eq!(value["tokenId"], serde_json::Value::Null);
        assert!(value.get("updatedAt").is_none());
    }

    #[test]
    fn test_release_effective_status_defaults_to_success() {
        let release = Release::new("demo", "Demo", "a.zip", ts("2024-01-01T00:00:00Z"))
            .with_status(None);
        assert_eq!(release.effective_status(), STATUS_SUCCESS);
        assert!(release.is_success());

        let failed = release.with_status(Some("failed"));
        assert!(!failed.is_success());
    }

    #[test]
    fn test_release_new_is_manual() {
        let release = Release::new("demo", "Demo", "a.zip", ts("2024-01-01T00:00:00Z"));
        assert!(release.is_manual());
        assert_eq!(release.version, UNSPECIFIED_VERSION);

        let published = release.with_publisher(&Publisher::Token {
            id: "t1".to_string(),
            name: "ci".to_string(),
        });
        assert!(!published.is_manual());
        assert_eq!(published.token_name, "ci");
        assert_eq!(published.token_id.as_deref(), Some("t1"));
    }

    #[test]
    fn test_release_deserializes_with_only_identity_fields() {
        let json = r#"{"id": "r1", "uploadedAt": "2024-01-01T00:00:00.000Z"}"#;
        let release: Release = serde_json::from_str(json).unwrap();

        assert_eq!(release.app_id, "");
        assert_eq!(release.app_name, "");
        assert_eq!(release.version, UNSPECIFIED_VERSION);
        assert_eq!(release.file_path, "");
        assert_eq!(release.file_size, 0);
        assert_eq!(release.token_name, "");
        assert!(release.is_success());
    }

    #[test]
    fn test_app_deserializes_without_name_or_updated_at() {
        let json = r#"{"appId": "demo", "createdAt": "2024-01-01T00:00:00.000Z"}"#;
        let app: App = serde_json::from_str(json).unwrap();

        assert_eq!(app.name, "");
        assert_eq!(app.updated_at, DateTime::<Utc>::default());
    }

    #[test]
    fn test_legacy_manual_publisher_counts_as_manual() {
        let mut release = Release::new("demo", "Demo", "a.zip", ts("2024-01-01T00:00:00Z"));
        release.token_name = LEGACY_MANUAL_PUBLISHER.to_string();
        assert!(release.is_manual());

        release.token_name = "ci".to_string();
        assert!(!release.is_manual());
    }

    #[test]
    fn test_release_patch() {
        assert!(ReleasePatch::default().is_empty());

        let mut release = Release::new("demo", "Demo", "a.zip", ts("2024-01-01T00:00:00Z"))
            .with_description("old");
        let now = ts("2024-01-02T00:00:00Z");
        let patch = ReleasePatch::default().version("1.2.0");
        assert!(!patch.is_empty());

        patch.apply(&mut release, now);

        assert_eq!(release.version, "1.2.0");
        assert_eq!(release.description.as_deref(), Some("old"));
        assert_eq!(release.updated_at, Some(now));
    }
}
