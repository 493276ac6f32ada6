//! Storage backends and the facade that selects one.
//!
//! The backend is chosen once from [`StorageConfig::driver`]; callers hold a
//! cloned [`Storage`] and never see which adapter is behind it.
//!
//! - `json`: one JSON array file per collection (`json::JsonRepository`)
//! - `sqlite`: a single SQLite database (`sqlite::SqliteRepository`)

pub mod json;
pub mod sqlite;


use std::sync::Arc;

use fileupdate_core::catalog::{
    latest_per_app, App, AppPatch, PublishBatch, Release, ReleaseFilter, ReleasePatch, Token,
};
use fileupdate_core::clock;
use fileupdate_core::config::{Driver, StorageConfig};
use fileupdate_core::storage::{RepositoryError, Result, StorageBackend};

use crate::artifacts::ArtifactStore;

pub use json::JsonRepository;
pub use sqlite::SqliteRepository;

/// The storage facade: every persistence operation goes through here.
#[derive(Clone)]
pub struct Storage {
    backend: Arc<dyn StorageBackend>,
    driver: Driver,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("driver", &self.driver)
            .finish_non_exhaustive()
    }
}

impl Storage {
    /// Constructs the backend named by `config.driver`.
    pub async fn open(config: &StorageConfig) -> Result<Self> {
        let backend: Arc<dyn StorageBackend> = match config.driver {
            Driver::Sqlite => Arc::new(SqliteRepository::new(&config.sqlite).await?),
            Driver::Json => Arc::new(JsonRepository::new(&config.json.base_dir).await?),
        };

        tracing::info!(driver = %config.driver, "Storage ready");
        Ok(Self::from_backend(backend, config.driver))
    }

    /// Wraps an already constructed backend.
    pub fn from_backend(backend: Arc<dyn StorageBackend>, driver: Driver) -> Self {
        Self { backend, driver }
    }

    /// The active driver.
    pub fn driver(&self) -> Driver {
        self.driver
    }

    // ------------------------------------------------------------------------
    // Tokens
    // ------------------------------------------------------------------------

    pub async fn list_tokens(&self) -> Result<Vec<Token>> {
        self.backend.list_tokens().await
    }

    pub async fn create_token(&self, token: &Token) -> Result<Token> {
        let created = self.backend.create_token(token).await?;
        tracing::debug!(token_id = %created.id, name = %created.name, "Created token");
        Ok(created)
    }

    pub async fn disable_token(&self, id: &str) -> Result<Option<Token>> {
        self.backend.disable_token(id).await
    }

    pub async fn find_token_by_token(&self, value: &str) -> Result<Option<Token>> {
        self.backend.find_token_by_token(value).await
    }

    pub async fn touch_token_usage(&self, id: &str) -> Result<Option<Token>> {
        self.backend.touch_token_usage(id).await
    }

    // ------------------------------------------------------------------------
    // Apps
    // ------------------------------------------------------------------------

    pub async fn list_apps(&self) -> Result<Vec<App>> {
        self.backend.list_apps().await
    }

    pub async fn find_app_by_id(&self, app_id: &str) -> Result<Option<App>> {
        self.backend.find_app_by_id(app_id).await
    }

    pub async fn create_app(&self, app: &App) -> Result<App> {
        let created = self.backend.create_app(app).await?;
        tracing::debug!(app_id = %created.app_id, "Created app");
        Ok(created)
    }

    pub async fn update_app(&self, app_id: &str, patch: &AppPatch) -> Result<Option<App>> {
        self.backend.update_app(app_id, patch).await
    }

    /// Deletes an app record. Releases and their files stay behind.
    pub async fn delete_app(&self, app_id: &str) -> Result<bool> {
        self.backend.delete_app(app_id).await
    }

    // ------------------------------------------------------------------------
    // Releases
    // ------------------------------------------------------------------------

    pub async fn list_releases(&self, filter: &ReleaseFilter) -> Result<Vec<Release>> {
        self.backend.list_releases(filter).await
    }

    pub async fn create_releases(&self, releases: &[Release]) -> Result<Vec<Release>> {
        self.backend.create_releases(releases).await
    }

    pub async fn find_release_by_id(&self, id: &str) -> Result<Option<Release>> {
        self.backend.find_release_by_id(id).await
    }

    pub async fn update_release(&self, id: &str, patch: &ReleasePatch) -> Result<Option<Release>> {
        self.backend.update_release(id, patch).await
    }

    pub async fn increment_release_download(&self, id: &str) -> Result<Option<Release>> {
        self.backend.increment_release_download(id).await
    }

    pub async fn find_latest_release(&self, app_id: &str) -> Result<Option<Release>> {
        self.backend.find_latest_release(app_id).await
    }

    pub async fn delete_release(&self, id: &str) -> Result<Option<Release>> {
        self.backend.delete_release(id).await
    }

    // ------------------------------------------------------------------------
    // Composite operations
    // ------------------------------------------------------------------------

    /// Turns a publish batch into release records and stores them together.
    pub async fn publish(&self, batch: PublishBatch) -> Result<Vec<Release>> {
        let app_id = batch.app_id.clone();
        let releases = batch
            .into_releases(clock::now())
            .map_err(|e| RepositoryError::InvalidData(e.to_string()))?;

        let created = self.backend.create_releases(&releases).await?;
        tracing::info!(app_id = %app_id, count = created.len(), "Published releases");
        Ok(created)
    }

    /// Deletes a release record, then removes its file in the background.
    ///
    /// File removal is best-effort: its failures are logged, never returned.
    pub async fn delete_release_with_artifact(
        &self,
        id: &str,
        artifacts: &ArtifactStore,
    ) -> Result<Option<Release>> {
        let removed = self.backend.delete_release(id).await?;
        if let Some(release) = &removed {
            tracing::info!(release_id = %release.id, file_path = %release.file_path, "Deleted release");
            drop(artifacts.spawn_remove(release.file_path.clone()));
        }
        Ok(removed)
    }

    /// The newest successful release of every app, most recently released app first.
    pub async fn latest_per_app(&self) -> Result<Vec<Release>> {
        let releases = self.backend.list_releases(&ReleaseFilter::all()).await?;
        Ok(latest_per_app(&releases))
    }
}
