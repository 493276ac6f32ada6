//! JSON repository implementation.

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;

use fileupdate_core::catalog::{
    newest_apps_first, newest_releases_first, newest_tokens_first, App, AppPatch, Release,
    ReleaseFilter, ReleasePatch, Token,
};
use fileupdate_core::clock;
use fileupdate_core::storage::{
    AppRepository, ReleaseRepository, RepositoryError, Result, TokenRepository,
};

/// The three persisted collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Collection {
    Apps,
    Tokens,
    Releases,
}

impl Collection {
    const ALL: [Collection; 3] = [Collection::Apps, Collection::Tokens, Collection::Releases];

    fn file_name(self) -> &'static str {
        match self {
            Collection::Apps => "apps.json",
            Collection::Tokens => "tokens.json",
            Collection::Releases => "releases.json",
        }
    }
}

/// File-backed repository storing each collection as a JSON array.
#[derive(Debug, Clone)]
pub struct JsonRepository {
    base_dir: PathBuf,
}

impl JsonRepository {
    /// Opens the store in `base_dir`, creating the directory and any missing
    /// collection file (as `[]`).
    pub async fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).await.map_err(io_err)?;

        let repo = Self { base_dir };
        for collection in Collection::ALL {
            let path = repo.path(collection);
            if !fs::try_exists(&path).await.map_err(io_err)? {
                fs::write(&path, "[]").await.map_err(io_err)?;
            }
        }

        tracing::debug!(base_dir = %repo.base_dir.display(), "Opened JSON storage");
        Ok(repo)
    }

    fn path(&self, collection: Collection) -> PathBuf {
        self.base_dir.join(collection.file_name())
    }

    /// Reads a whole collection. Missing or corrupt files read as empty.
    async fn read<T: DeserializeOwned>(&self, collection: Collection) -> Vec<T> {
        let path = self.path(collection);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Failed to read collection");
                return Vec::new();
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(items) => items,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Failed to parse collection");
                Vec::new()
            }
        }
    }

    /// Rewrites a whole collection.
    async fn write<T: Serialize>(&self, collection: Collection, items: &[T]) -> Result<()> {
        let data = serde_json::to_vec_pretty(items)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        fs::write(self.path(collection), data).await.map_err(io_err)
    }
}

fn io_err(err: io::Error) -> RepositoryError {
    RepositoryError::Io(err.to_string())
}

// ============================================================================
// TokenRepository implementation
// ============================================================================

#[async_trait]
impl TokenRepository for JsonRepository {
    async fn list_tokens(&self) -> Result<Vec<Token>> {
        let mut tokens: Vec<Token> = self.read(Collection::Tokens).await;
        newest_tokens_first(&mut tokens);
        Ok(tokens)
    }

    async fn create_token(&self, token: &Token) -> Result<Token> {
        let mut tokens: Vec<Token> = self.read(Collection::Tokens).await;
        tokens.push(token.clone());
        self.write(Collection::Tokens, &tokens).await?;
        Ok(token.clone())
    }

    async fn disable_token(&self, id: &str) -> Result<Option<Token>> {
        let mut tokens: Vec<Token> = self.read(Collection::Tokens).await;
        let Some(index) = tokens.iter().position(|t| t.id == id) else {
            return Ok(None);
        };

        tokens[index].active = false;
        self.write(Collection::Tokens, &tokens).await?;
        Ok(Some(tokens.swap_remove(index)))
    }

    async fn find_token_by_token(&self, value: &str) -> Result<Option<Token>> {
        let tokens: Vec<Token> = self.read(Collection::Tokens).await;
        Ok(tokens.into_iter().find(|t| t.token == value))
    }

    async fn touch_token_usage(&self, id: &str) -> Result<Option<Token>> {
        let mut tokens: Vec<Token> = self.read(Collection::Tokens).await;
        let Some(index) = tokens.iter().position(|t| t.id == id) else {
            return Ok(None);
        };

        let token = &mut tokens[index];
        token.last_used = Some(clock::now());
        token.usage_count += 1;
        self.write(Collection::Tokens, &tokens).await?;
        Ok(Some(tokens.swap_remove(index)))
    }
}

// ============================================================================
// AppRepository implementation
// ============================================================================

#[async_trait]
impl AppRepository for JsonRepository {
    async fn list_apps(&self) -> Result<Vec<App>> {
        let mut apps: Vec<App> = self.read(Collection::Apps).await;
        newest_apps_first(&mut apps);
        Ok(apps)
    }

    async fn find_app_by_id(&self, app_id: &str) -> Result<Option<App>> {
        let apps: Vec<App> = self.read(Collection::Apps).await;
        Ok(apps.into_iter().find(|a| a.app_id == app_id))
    }

    async fn create_app(&self, app: &App) -> Result<App> {
        let mut apps: Vec<App> = self.read(Collection::Apps).await;
        apps.push(app.clone());
        self.write(Collection::Apps, &apps).await?;
        Ok(app.clone())
    }

    async fn update_app(&self, app_id: &str, patch: &AppPatch) -> Result<Option<App>> {
        let mut apps: Vec<App> = self.read(Collection::Apps).await;
        let Some(index) = apps.iter().position(|a| a.app_id == app_id) else {
            return Ok(None);
        };

        patch.apply(&mut apps[index], clock::now());
        self.write(Collection::Apps, &apps).await?;
        Ok(Some(apps.swap_remove(index)))
    }

    async fn delete_app(&self, app_id: &str) -> Result<bool> {
        let mut apps: Vec<App> = self.read(Collection::Apps).await;
        let Some(index) = apps.iter().position(|a| a.app_id == app_id) else {
            return Ok(false);
        };

        apps.remove(index);
        self.write(Collection::Apps, &apps).await?;
        Ok(true)
    }
}

// ============================================================================
// ReleaseRepository implementation
// ============================================================================

#[async_trait]
impl ReleaseRepository for JsonRepository {
    async fn list_releases(&self, filter: &ReleaseFilter) -> Result<Vec<Release>> {
        let releases: Vec<Release> = self.read(Collection::Releases).await;
        let mut matching: Vec<Release> =
            releases.into_iter().filter(|r| filter.matches(r)).collect();
        newest_releases_first(&mut matching);
        Ok(matching)
    }

    async fn create_releases(&self, entries: &[Release]) -> Result<Vec<Release>> {
        let mut releases: Vec<Release> = self.read(Collection::Releases).await;
        releases.extend_from_slice(entries);
        self.write(Collection::Releases, &releases).await?;
        Ok(entries.to_vec())
    }

    async fn find_release_by_id(&self, id: &str) -> Result<Option<Release>> {
        let releases: Vec<Release> = self.read(Collection::Releases).await;
        Ok(releases.into_iter().find(|r| r.id == id))
    }

    async fn update_release(&self, id: &str, patch: &ReleasePatch) -> Result<Option<Release>> {
        if patch.is_empty() {
            return Err(RepositoryError::InvalidData(
                "release update requires version or description".to_string(),
            ));
        }

        let mut releases: Vec<Release> = self.read(Collection::Releases).await;
        let Some(index) = releases.iter().position(|r| r.id == id) else {
            return Ok(None);
        };

        patch.apply(&mut releases[index], clock::now());
        self.write(Collection::Releases, &releases).await?;
        Ok(Some(releases.swap_remove(index)))
    }

    async fn increment_release_download(&self, id: &str) -> Result<Option<Release>> {
        let mut releases: Vec<Release> = self.read(Collection::Releases).await;
        let Some(index) = releases.iter().position(|r| r.id == id) else {
            return Ok(None);
        };

        releases[index].download_count += 1;
        self.write(Collection::Releases, &releases).await?;
        Ok(Some(releases.swap_remove(index)))
    }

    async fn find_latest_release(&self, app_id: &str) -> Result<Option<Release>> {
        let latest = self
            .list_releases(&ReleaseFilter::successful_for(app_id))
            .await?;
        Ok(latest.into_iter().next())
    }

    async fn delete_release(&self, id: &str) -> Result<Option<Release>> {
        let mut releases: Vec<Release> = self.read(Collection::Releases).await;
        let Some(index) = releases.iter().position(|r| r.id == id) else {
            return Ok(None);
        };

        let removed = releases.remove(index);
        self.write(Collection::Releases, &releases).await?;
        Ok(Some(removed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fileupdate_core::clock::parse_timestamp;

    async fn open() -> (tempfile::TempDir, JsonRepository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonRepository::new(dir.path()).await.unwrap();
        (dir, repo)
    }

    fn release(id: &str, app_id: &str, uploaded_at: &str) -> Release {
        Release::new(app_id, "Demo", "a.zip", parse_timestamp(uploaded_at).unwrap()).with_id(id)
    }

    #[tokio::test]
    async fn test_new_creates_empty_collection_files() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("nested").join("state");

        JsonRepository::new(&base).await.unwrap();

        for name in ["apps.json", "tokens.json", "releases.json"] {
            let contents = std::fs::read_to_string(base.join(name)).unwrap();
            assert_eq!(contents, "[]");
        }
    }

    #[tokio::test]
    async fn test_new_keeps_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonRepository::new(dir.path()).await.unwrap();
        repo.create_app(&App::new("demo", "Demo")).await.unwrap();

        let reopened = JsonRepository::new(dir.path()).await.unwrap();

        assert!(reopened.find_app_by_id("demo").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_files_are_pretty_printed_camel_case() {
        let (dir, repo) = open().await;
        repo.create_releases(&[release("r1", "demo", "2024-01-01T00:00:00Z")])
            .await
            .unwrap();

        let contents = std::fs::read_to_string(dir.path().join("releases.json")).unwrap();

        assert!(contents.contains('\n'));
        assert!(contents.contains("\"appId\": \"demo\""));
        assert!(contents.contains("\"downloadCount\": 0"));
    }

    #[tokio::test]
    async fn test_duplicate_app_id_appends_second_entry() {
        let (_dir, repo) = open().await;
        repo.create_app(&App::new("demo", "First")).await.unwrap();
        repo.create_app(&App::new("demo", "Second")).await.unwrap();

        assert_eq!(repo.list_apps().await.unwrap().len(), 2);
        let found = repo.find_app_by_id("demo").await.unwrap().unwrap();
        assert_eq!(found.name, "First");

        assert!(repo.delete_app("demo").await.unwrap());
        let remaining = repo.find_app_by_id("demo").await.unwrap().unwrap();
        assert_eq!(remaining.name, "Second");
        assert_eq!(repo.list_apps().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_file_reads_as_empty() {
        let (dir, repo) = open().await;
        std::fs::write(dir.path().join("releases.json"), "{ not an array").unwrap();

        let releases = repo.list_releases(&ReleaseFilter::all()).await.unwrap();

        assert!(releases.is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let (dir, repo) = open().await;
        std::fs::remove_file(dir.path().join("tokens.json")).unwrap();

        assert!(repo.list_tokens().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_fault_is_reported_as_io() {
        let (dir, repo) = open().await;
        let path = dir.path().join("releases.json");
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let result = repo
            .create_releases(&[release("r1", "demo", "2024-01-01T00:00:00Z")])
            .await;

        assert!(matches!(result, Err(RepositoryError::Io(_))));
    }

    #[tokio::test]
    async fn test_reads_legacy_records_missing_optional_fields() {
        let (dir, repo) = open().await;
        std::fs::write(
            dir.path().join("releases.json"),
            r#"[{
                "id": "r1",
                "appId": "demo",
                "appName": "Demo",
                "version": "1.0.0",
                "fileName": "a.zip",
                "filePath": "1704067200000-a.zip",
                "fileSize": 10,
                "tokenName": "manual",
                "uploadedAt": "2024-01-01T00:00:00.000Z"
            }]"#,
        )
        .unwrap();

        let release = repo.find_release_by_id("r1").await.unwrap().unwrap();

        assert_eq!(release.status, None);
        assert_eq!(release.download_count, 0);
        assert_eq!(release.token_id, None);
        assert!(repo.find_latest_release("demo").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_release_without_app_id_survives_next_write() {
        let (dir, repo) = open().await;
        let path = dir.path().join("releases.json");
        std::fs::write(
            &path,
            r#"[
                {
                    "id": "old",
                    "fileName": "legacy.zip",
                    "filePath": "1600000000000-legacy.zip",
                    "tokenName": "手动发布",
                    "uploadedAt": "2020-09-13T12:26:40.000Z"
                },
                {
                    "id": "keep",
                    "appId": "demo",
                    "appName": "Demo",
                    "version": "1.0.0",
                    "fileName": "a.zip",
                    "filePath": "1704067200000-a.zip",
                    "fileSize": 10,
                    "tokenName": "manual",
                    "uploadedAt": "2024-01-01T00:00:00.000Z"
                }
            ]"#,
        )
        .unwrap();

        assert_eq!(repo.list_releases(&ReleaseFilter::all()).await.unwrap().len(), 2);

        repo.create_releases(&[release("new", "demo", "2024-02-01T00:00:00Z")])
            .await
            .unwrap();

        let ids: Vec<String> = repo
            .list_releases(&ReleaseFilter::all())
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["new", "keep", "old"]);

        let old = repo.find_release_by_id("old").await.unwrap().unwrap();
        assert_eq!(old.app_id, "");
        assert!(old.is_manual());

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\"id\": \"old\""));
        assert!(contents.contains("\"id\": \"keep\""));
    }
}
