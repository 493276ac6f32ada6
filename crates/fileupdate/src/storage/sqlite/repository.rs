//! SQLite repository implementation.
//!
//! Implements the repository traits from `fileupdate_core::storage` using SQLite.

use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use fileupdate_core::catalog::{
    App, AppPatch, Release, ReleaseFilter, ReleasePatch, Token, STATUS_SUCCESS,
};
use fileupdate_core::clock::{self, format_timestamp};
use fileupdate_core::config::SqliteConfig;
use fileupdate_core::storage::{
    AppRepository, ReleaseRepository, RepositoryError, Result, TokenRepository,
};

use super::conversions::{
    count_to_i64, release_to_params, row_to_app, row_to_release, row_to_token,
};
use super::error::{map_rusqlite_error, map_tokio_rusqlite_error, map_tokio_rusqlite_error_with_id};
use super::schema;

/// Helper to wrap rusqlite errors for tokio_rusqlite closures.
fn wrap_err(e: rusqlite::Error) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Rusqlite(e)
}

/// SQLite-based repository implementation.
///
/// Holds one long-lived connection; SQLite serializes writers.
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Opens (or creates) the database described by `config`.
    ///
    /// Creates the parent directory, applies the configured pragmas
    /// best-effort, then creates and migrates the schema.
    pub async fn new(config: &SqliteConfig) -> Result<Self> {
        if let Some(parent) = config.filename.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| RepositoryError::Io(e.to_string()))?;
            }
        }

        let conn = Connection::open(&config.filename)
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        apply_pragmas(&conn, config).await;
        Self::init_schema(&conn).await?;

        tracing::debug!(filename = %config.filename.display(), "Opened SQLite storage");
        Ok(Self { conn })
    }

    /// Creates a new repository with an in-memory database.
    ///
    /// Useful for testing - data is lost when the connection is dropped.
    pub async fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        Self::init_schema(&conn).await?;

        Ok(Self { conn })
    }

    /// Initialize the database schema and add columns missing from legacy databases.
    async fn init_schema(conn: &Connection) -> Result<()> {
        let migrated = conn
            .call(|conn| {
                conn.execute_batch(schema::CREATE_TABLES)
                    .map_err(wrap_err)?;

                let mut stmt = conn
                    .prepare(schema::RELEASE_TABLE_INFO)
                    .map_err(wrap_err)?;
                let columns = stmt
                    .query_map([], |row| row.get::<_, String>(1))
                    .map_err(wrap_err)?
                    .collect::<rusqlite::Result<Vec<_>>>()
                    .map_err(wrap_err)?;

                if columns.iter().any(|c| c == "updatedAt") {
                    return Ok(false);
                }
                conn.execute_batch(schema::ADD_RELEASE_UPDATED_AT)
                    .map_err(wrap_err)?;
                Ok(true)
            })
            .await
            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        if migrated {
            tracing::info!("Added updatedAt column to releases table");
        }
        Ok(())
    }
}

/// Applies each configured pragma. Invalid ones are logged and skipped.
async fn apply_pragmas(conn: &Connection, config: &SqliteConfig) {
    for (key, value) in &config.pragma {
        let Some(sql) = pragma_statement(key, value) else {
            tracing::warn!(pragma = %key, value = %value, "Skipping invalid pragma");
            continue;
        };

        let result = conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql).map_err(wrap_err)?;
                let mut rows = stmt.query([]).map_err(wrap_err)?;
                while rows.next().map_err(wrap_err)?.is_some() {}
                Ok(())
            })
            .await;

        match result {
            Ok(()) => tracing::debug!(pragma = %key, value = %value, "Applied pragma"),
            Err(err) => {
                tracing::warn!(pragma = %key, value = %value, error = %err, "Failed to apply pragma")
            }
        }
    }
}

/// Renders `PRAGMA key = value`, or `None` when the key or value cannot be
/// expressed safely.
fn pragma_statement(key: &str, value: &serde_json::Value) -> Option<String> {
    let is_identifier = !key.is_empty()
        && !key.starts_with(|c: char| c.is_ascii_digit())
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !is_identifier {
        return None;
    }

    let rendered = match value {
        serde_json::Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => i32::from(*b).to_string(),
        _ => return None,
    };

    Some(format!("PRAGMA {key} = {rendered}"))
}

// ============================================================================
// TokenRepository implementation
// ============================================================================

#[async_trait]
impl TokenRepository for SqliteRepository {
    async fn list_tokens(&self) -> Result<Vec<Token>> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(&schema::select_tokens()).map_err(wrap_err)?;
                let rows = stmt.query_map([], row_to_token).map_err(wrap_err)?;

                let mut tokens = Vec::new();
                for row_result in rows {
                    tokens.push(row_result.map_err(wrap_err)?);
                }
                Ok(tokens)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "Token"))
    }

    async fn create_token(&self, token: &Token) -> Result<Token> {
        let id = token.id.clone();
        let credential = token.token.clone();
        let name = token.name.clone();
        let description = token.description.clone();
        let created_at = format_timestamp(&token.created_at);
        let last_used = token.last_used.as_ref().map(format_timestamp);
        let active = token.active;
        let usage_count = count_to_i64("usageCount", token.usage_count)?;

        self.conn
            .call(move |conn| {
                conn.execute(
                    schema::INSERT_TOKEN,
                    rusqlite::params![
                        id,
                        credential,
                        name,
                        description,
                        created_at,
                        last_used,
                        active,
                        usage_count
                    ],
                )
                .map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "Token", token.id.clone()))?;

        Ok(token.clone())
    }

    async fn disable_token(&self, id: &str) -> Result<Option<Token>> {
        let id_str = id.to_string();

        self.conn
            .call(move |conn| {
                let changed = conn
                    .execute(schema::DISABLE_TOKEN, [&id_str])
                    .map_err(wrap_err)?;
                if changed == 0 {
                    return Ok(None);
                }
                conn.query_row(&schema::select_token_by_id(), [&id_str], row_to_token)
                    .optional()
                    .map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "Token", id))
    }

    async fn find_token_by_token(&self, value: &str) -> Result<Option<Token>> {
        let value = value.to_string();

        self.conn
            .call(move |conn| {
                conn.query_row(&schema::select_token_by_value(), [&value], row_to_token)
                    .optional()
                    .map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "Token"))
    }

    async fn touch_token_usage(&self, id: &str) -> Result<Option<Token>> {
        let id_str = id.to_string();
        let now = format_timestamp(&clock::now());

        self.conn
            .call(move |conn| {
                let changed = conn
                    .execute(schema::TOUCH_TOKEN, [&now, &id_str])
                    .map_err(wrap_err)?;
                if changed == 0 {
                    return Ok(None);
                }
                conn.query_row(&schema::select_token_by_id(), [&id_str], row_to_token)
                    .optional()
                    .map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "Token", id))
    }
}

// ============================================================================
// AppRepository implementation
// ============================================================================

#[async_trait]
impl AppRepository for SqliteRepository {
    async fn list_apps(&self) -> Result<Vec<App>> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(&schema::select_apps()).map_err(wrap_err)?;
                let rows = stmt.query_map([], row_to_app).map_err(wrap_err)?;

                let mut apps = Vec::new();
                for row_result in rows {
                    apps.push(row_result.map_err(wrap_err)?);
                }
                Ok(apps)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "App"))
    }

    async fn find_app_by_id(&self, app_id: &str) -> Result<Option<App>> {
        let app_id_str = app_id.to_string();

        self.conn
            .call(move |conn| {
                conn.query_row(&schema::select_app_by_id(), [&app_id_str], row_to_app)
                    .optional()
                    .map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "App", app_id))
    }

    async fn create_app(&self, app: &App) -> Result<App> {
        let app_id = app.app_id.clone();
        let name = app.name.clone();
        let description = app.description.clone();
        let created_at = format_timestamp(&app.created_at);
        let updated_at = format_timestamp(&app.updated_at);

        self.conn
            .call(move |conn| {
                conn.execute(
                    schema::INSERT_APP,
                    rusqlite::params![app_id, name, description, created_at, updated_at],
                )
                .map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "App", app.app_id.clone()))?;

        Ok(app.clone())
    }

    async fn update_app(&self, app_id: &str, patch: &AppPatch) -> Result<Option<App>> {
        let app_id_str = app_id.to_string();
        let name = patch.name.clone();
        let description = patch.description.clone();
        let updated_at = format_timestamp(&clock::now());

        self.conn
            .call(move |conn| {
                let changed = conn
                    .execute(
                        schema::UPDATE_APP,
                        rusqlite::params![name, description, updated_at, app_id_str],
                    )
                    .map_err(wrap_err)?;
                if changed == 0 {
                    return Ok(None);
                }
                conn.query_row(&schema::select_app_by_id(), [&app_id_str], row_to_app)
                    .optional()
                    .map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "App", app_id))
    }

    async fn delete_app(&self, app_id: &str) -> Result<bool> {
        let app_id_str = app_id.to_string();

        self.conn
            .call(move |conn| {
                let deleted = conn
                    .execute(schema::DELETE_APP, [&app_id_str])
                    .map_err(wrap_err)?;
                Ok(deleted > 0)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "App", app_id))
    }
}

// ============================================================================
// ReleaseRepository implementation
// ============================================================================

#[async_trait]
impl ReleaseRepository for SqliteRepository {
    async fn list_releases(&self, filter: &ReleaseFilter) -> Result<Vec<Release>> {
        let sql = schema::select_releases(filter.app_id().is_some(), filter.status().is_some());
        let params: Vec<String> = filter
            .app_id()
            .into_iter()
            .chain(filter.status())
            .map(str::to_string)
            .collect();

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql).map_err(wrap_err)?;
                let rows = stmt
                    .query_map(rusqlite::params_from_iter(params.iter()), row_to_release)
                    .map_err(wrap_err)?;

                let mut releases = Vec::new();
                for row_result in rows {
                    releases.push(row_result.map_err(wrap_err)?);
                }
                Ok(releases)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "Release"))
    }

    async fn create_releases(&self, releases: &[Release]) -> Result<Vec<Release>> {
        let rows = releases
            .iter()
            .map(|r| Ok((r.id.clone(), release_to_params(r)?)))
            .collect::<Result<Vec<(String, Vec<Value>)>>>()?;

        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                {
                    let mut stmt = tx.prepare(schema::INSERT_RELEASE).map_err(wrap_err)?;
                    for (id, params) in &rows {
                        if let Err(e) = stmt.execute(rusqlite::params_from_iter(params.iter())) {
                            let mapped = map_rusqlite_error(&e, "Release", id);
                            return Err(tokio_rusqlite::Error::Other(Box::new(mapped)));
                        }
                    }
                }
                tx.commit().map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "Release"))?;

        tracing::debug!(count = releases.len(), "Inserted releases");
        Ok(releases.to_vec())
    }

    async fn find_release_by_id(&self, id: &str) -> Result<Option<Release>> {
        let id_str = id.to_string();

        self.conn
            .call(move |conn| {
                conn.query_row(&schema::select_release_by_id(), [&id_str], row_to_release)
                    .optional()
                    .map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "Release", id))
    }

    async fn update_release(&self, id: &str, patch: &ReleasePatch) -> Result<Option<Release>> {
        if patch.is_empty() {
            return Err(RepositoryError::InvalidData(
                "release update requires version or description".to_string(),
            ));
        }

        let id_str = id.to_string();
        let version = patch.version.clone();
        let description = patch.description.clone();
        let updated_at = format_timestamp(&clock::now());

        self.conn
            .call(move |conn| {
                let changed = conn
                    .execute(
                        schema::UPDATE_RELEASE,
                        rusqlite::params![version, description, updated_at, id_str],
                    )
                    .map_err(wrap_err)?;
                if changed == 0 {
                    return Ok(None);
                }
                conn.query_row(&schema::select_release_by_id(), [&id_str], row_to_release)
                    .optional()
                    .map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "Release", id))
    }

    async fn increment_release_download(&self, id: &str) -> Result<Option<Release>> {
        let id_str = id.to_string();

        self.conn
            .call(move |conn| {
                let changed = conn
                    .execute(schema::INCREMENT_RELEASE_DOWNLOAD, [&id_str])
                    .map_err(wrap_err)?;
                if changed == 0 {
                    return Ok(None);
                }
                conn.query_row(&schema::select_release_by_id(), [&id_str], row_to_release)
                    .optional()
                    .map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "Release", id))
    }

    async fn find_latest_release(&self, app_id: &str) -> Result<Option<Release>> {
        let app_id_str = app_id.to_string();

        self.conn
            .call(move |conn| {
                conn.query_row(
                    &schema::select_latest_release(),
                    [app_id_str.as_str(), STATUS_SUCCESS],
                    row_to_release,
                )
                .optional()
                .map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "Release"))
    }

    async fn delete_release(&self, id: &str) -> Result<Option<Release>> {
        let id_str = id.to_string();

        self.conn
            .call(move |conn| {
                let existing = conn
                    .query_row(&schema::select_release_by_id(), [&id_str], row_to_release)
                    .optional()
                    .map_err(wrap_err)?;
                if existing.is_some() {
                    conn.execute(schema::DELETE_RELEASE, [&id_str])
                        .map_err(wrap_err)?;
                }
                Ok(existing)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "Release", id))
    }
}
