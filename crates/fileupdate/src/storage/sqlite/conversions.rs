//! SQLite row conversion functions.
//!
//! Pure functions for converting between SQLite rows and domain types.
//! These are testable in isolation without database access.

use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::Row;

use fileupdate_core::catalog::{App, Release, Token, UNSPECIFIED_VERSION};
use fileupdate_core::clock::{format_timestamp, parse_timestamp};
use fileupdate_core::storage::RepositoryError;

// ============================================================================
// Token conversions
// ============================================================================

/// Convert a SQLite row to a Token.
///
/// Expected columns: id, token, name, description, createdAt, lastUsed,
/// active, usageCount
pub fn row_to_token(row: &Row) -> rusqlite::Result<Token> {
    let created_at: String = row.get(4)?;
    let last_used: Option<String> = row.get(5)?;
    let active: Option<i64> = row.get(6)?;
    let usage_count: Option<i64> = row.get(7)?;

    Ok(Token {
        id: row.get(0)?,
        token: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        created_at: parse_datetime(4, &created_at)?,
        last_used: last_used
            .map(|s| parse_datetime(5, &s))
            .transpose()?,
        active: active.map_or(true, |v| v != 0),
        usage_count: parse_count(7, usage_count)?,
    })
}

// ============================================================================
// App conversions
// ============================================================================

/// Convert a SQLite row to an App.
///
/// Expected columns: appId, name, description, createdAt, updatedAt
pub fn row_to_app(row: &Row) -> rusqlite::Result<App> {
    let created_at: String = row.get(3)?;
    let updated_at: String = row.get(4)?;

    Ok(App {
        app_id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: parse_datetime(3, &created_at)?,
        updated_at: parse_datetime(4, &updated_at)?,
    })
}

// ============================================================================
// Release conversions
// ============================================================================

/// Convert a SQLite row to a Release.
///
/// Expected columns: id, appId, appName, version, description, fileName,
/// filePath, fileSize, tokenName, tokenId, uploadedAt, status,
/// downloadCount, updatedAt
///
/// Older databases allow NULL in appId, appName, version, fileSize and
/// tokenName; those read as empty, [`UNSPECIFIED_VERSION`] or zero.
pub fn row_to_release(row: &Row) -> rusqlite::Result<Release> {
    let app_id: Option<String> = row.get(1)?;
    let app_name: Option<String> = row.get(2)?;
    let version: Option<String> = row.get(3)?;
    let file_size: Option<i64> = row.get(7)?;
    let token_name: Option<String> = row.get(8)?;
    let uploaded_at: String = row.get(10)?;
    let download_count: Option<i64> = row.get(12)?;
    let updated_at: Option<String> = row.get(13)?;

    Ok(Release {
        id: row.get(0)?,
        app_id: app_id.unwrap_or_default(),
        app_name: app_name.unwrap_or_default(),
        version: version.unwrap_or_else(|| UNSPECIFIED_VERSION.to_string()),
        description: row.get(4)?,
        file_name: row.get(5)?,
        file_path: row.get(6)?,
        file_size: parse_count(7, file_size)?,
        token_name: token_name.unwrap_or_default(),
        token_id: row.get(9)?,
        uploaded_at: parse_datetime(10, &uploaded_at)?,
        status: row.get(11)?,
        download_count: parse_count(12, download_count)?,
        updated_at: updated_at
            .map(|s| parse_datetime(13, &s))
            .transpose()?,
    })
}

/// Parameters for `INSERT_RELEASE`, in placeholder order.
pub fn release_to_params(release: &Release) -> Result<Vec<Value>, RepositoryError> {
    Ok(vec![
        Value::Text(release.id.clone()),
        Value::Text(release.app_id.clone()),
        Value::Text(release.app_name.clone()),
        Value::Text(release.version.clone()),
        optional_text(release.description.as_deref()),
        Value::Text(release.file_name.clone()),
        Value::Text(release.file_path.clone()),
        Value::Integer(count_to_i64("fileSize", release.file_size)?),
        Value::Text(release.token_name.clone()),
        optional_text(release.token_id.as_deref()),
        Value::Text(format_timestamp(&release.uploaded_at)),
        optional_text(release.status.as_deref()),
        Value::Integer(count_to_i64("downloadCount", release.download_count)?),
        optional_text(release.updated_at.as_ref().map(format_timestamp).as_deref()),
    ])
}

fn optional_text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |s| Value::Text(s.to_string()))
}

// ============================================================================
// Helpers
// ============================================================================

/// Converts a counter for storage. SQLite integers are signed.
pub fn count_to_i64(field: &str, value: u64) -> Result<i64, RepositoryError> {
    i64::try_from(value)
        .map_err(|_| RepositoryError::InvalidData(format!("{field} out of range: {value}")))
}

/// Reads a non-negative counter; legacy rows may hold NULL, read as zero.
fn parse_count(column: usize, value: Option<i64>) -> rusqlite::Result<u64> {
    let value = value.unwrap_or(0);
    u64::try_from(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, Type::Integer, Box::new(e))
    })
}

/// Parse a datetime from RFC 3339 string.
fn parse_datetime(column: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    parse_timestamp(s)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn test_count_to_i64_rejects_overflow() {
        assert_eq!(count_to_i64("fileSize", 42).unwrap(), 42);
        assert!(matches!(
            count_to_i64("fileSize", u64::MAX),
            Err(RepositoryError::InvalidData(_))
        ));
    }

    #[test]
    fn test_parse_count_treats_null_as_zero() {
        assert_eq!(parse_count(0, None).unwrap(), 0);
        assert_eq!(parse_count(0, Some(7)).unwrap(), 7);
        assert!(parse_count(0, Some(-1)).is_err());
    }

    #[test]
    fn test_parse_datetime_rejects_garbage() {
        assert!(parse_datetime(0, "2024-01-01T00:00:00.000Z").is_ok());
        assert!(parse_datetime(0, "yesterday").is_err());
    }

    #[test]
    fn test_release_to_params_maps_optionals_to_null() {
        let release = Release::new("demo", "Demo", "a.zip", ts("2024-01-01T00:00:00Z"))
            .with_id("r1")
            .with_status(None);

        let params = release_to_params(&release).unwrap();

        assert_eq!(params.len(), 14);
        assert_eq!(params[0], Value::Text("r1".to_string()));
        assert_eq!(params[4], Value::Null);
        assert_eq!(params[9], Value::Null);
        assert_eq!(params[11], Value::Null);
        assert_eq!(params[13], Value::Null);
    }

    #[test]
    fn test_row_to_release_defaults_null_columns() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let release = conn
            .query_row(
                "SELECT 'r1', NULL, NULL, NULL, NULL, 'a.zip', '1704067200000-a.zip', NULL, \
                 NULL, NULL, '2024-01-01T00:00:00Z', NULL, NULL, NULL",
                [],
                row_to_release,
            )
            .unwrap();

        assert_eq!(release.app_id, "");
        assert_eq!(release.app_name, "");
        assert_eq!(release.version, UNSPECIFIED_VERSION);
        assert_eq!(release.file_size, 0);
        assert_eq!(release.token_name, "");
        assert!(release.is_success());
    }

    #[test]
    fn test_row_to_token_normalizes_active_flag() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let token = conn
            .query_row(
                "SELECT 't1', 'abc', 'ci', NULL, '2024-01-01T00:00:00Z', NULL, 0, NULL",
                [],
                row_to_token,
            )
            .unwrap();

        assert!(!token.active);
        assert_eq!(token.usage_count, 0);
        assert_eq!(token.last_used, None);
        assert_eq!(token.created_at, ts("2024-01-01T00:00:00Z"));
    }
}
