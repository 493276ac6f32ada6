use async_trait::async_trait;

use crate::catalog::{App, AppPatch, Release, ReleaseFilter, ReleasePatch, Token};

use super::Result;

/// Repository for publish tokens.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Lists all tokens, newest first by creation time.
    async fn list_tokens(&self) -> Result<Vec<Token>>;

    /// Stores a token and returns it unmodified.
    async fn create_token(&self, token: &Token) -> Result<Token>;

    /// Marks a token inactive. Disabling twice is not an error.
    async fn disable_token(&self, id: &str) -> Result<Option<Token>>;

    /// Finds a token by its credential value.
    async fn find_token_by_token(&self, value: &str) -> Result<Option<Token>>;

    /// Increments `usage_count` and sets `last_used` to now.
    async fn touch_token_usage(&self, id: &str) -> Result<Option<Token>>;
}

/// Repository for apps.
#[async_trait]
pub trait AppRepository: Send + Sync {
    /// Lists all apps, newest first by creation time.
    async fn list_apps(&self) -> Result<Vec<App>>;

    /// Gets an app by its app id.
    async fn find_app_by_id(&self, app_id: &str) -> Result<Option<App>>;

    /// Stores an app and returns it unmodified.
    async fn create_app(&self, app: &App) -> Result<App>;

    /// Merges the patch into an app and refreshes `updated_at`.
    async fn update_app(&self, app_id: &str, patch: &AppPatch) -> Result<Option<App>>;

    /// Deletes an app. Its releases are left in place.
    async fn delete_app(&self, app_id: &str) -> Result<bool>;
}

/// Repository for releases.
#[async_trait]
pub trait ReleaseRepository: Send + Sync {
    /// Lists releases matching `filter`, newest first by upload time.
    async fn list_releases(&self, filter: &ReleaseFilter) -> Result<Vec<Release>>;

    /// Inserts a batch of releases. Either all are stored or none are.
    async fn create_releases(&self, releases: &[Release]) -> Result<Vec<Release>>;

    /// Gets a release by its ID.
    async fn find_release_by_id(&self, id: &str) -> Result<Option<Release>>;

    /// Edits version and/or description. An empty patch is rejected.
    async fn update_release(&self, id: &str, patch: &ReleasePatch) -> Result<Option<Release>>;

    /// Adds one to `download_count`.
    async fn increment_release_download(&self, id: &str) -> Result<Option<Release>>;

    /// Gets the most recent successful release of an app.
    async fn find_latest_release(&self, app_id: &str) -> Result<Option<Release>>;

    /// Deletes a release and returns the removed record.
    async fn delete_release(&self, id: &str) -> Result<Option<Release>>;
}

/// A complete storage backend: every repository in one value.
pub trait StorageBackend: TokenRepository + AppRepository + ReleaseRepository {}

impl<T> StorageBackend for T where T: TokenRepository + AppRepository + ReleaseRepository {}
