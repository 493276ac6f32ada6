//! SQLite schema definitions and SQL query constants.
//!
//! Column names match the persisted camelCase field names so databases
//! written by earlier deployments open unchanged. Those may hold NULL in
//! release columns declared `NOT NULL` here; `conversions::row_to_release`
//! reads them with defaults.

/// SQL statement to create all tables.
pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS apps (
    appId TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    createdAt TEXT NOT NULL,
    updatedAt TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tokens (
    id TEXT PRIMARY KEY,
    token TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT,
    createdAt TEXT NOT NULL,
    lastUsed TEXT,
    active INTEGER NOT NULL DEFAULT 1,
    usageCount INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS releases (
    id TEXT PRIMARY KEY,
    appId TEXT NOT NULL,
    appName TEXT NOT NULL,
    version TEXT NOT NULL,
    description TEXT,
    fileName TEXT NOT NULL,
    filePath TEXT NOT NULL,
    fileSize INTEGER NOT NULL,
    tokenName TEXT NOT NULL,
    tokenId TEXT,
    uploadedAt TEXT NOT NULL,
    status TEXT DEFAULT 'success',
    downloadCount INTEGER DEFAULT 0,
    updatedAt TEXT
);

CREATE INDEX IF NOT EXISTS idx_releases_app_id ON releases(appId);
CREATE INDEX IF NOT EXISTS idx_tokens_token ON tokens(token);
"#;

/// Lists the columns of the releases table (name is column 1).
pub const RELEASE_TABLE_INFO: &str = "PRAGMA table_info(releases)";

/// Adds the edit timestamp to databases created before releases were editable.
pub const ADD_RELEASE_UPDATED_AT: &str = "ALTER TABLE releases ADD COLUMN updatedAt TEXT";

// ============================================================================
// Token queries
// ============================================================================

const TOKEN_COLUMNS: &str =
    "id, token, name, description, createdAt, lastUsed, active, usageCount";

pub fn select_tokens() -> String {
    format!("SELECT {TOKEN_COLUMNS} FROM tokens ORDER BY julianday(createdAt) DESC, rowid ASC")
}

pub fn select_token_by_id() -> String {
    format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE id = ?1")
}

pub fn select_token_by_value() -> String {
    format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE token = ?1 ORDER BY rowid ASC LIMIT 1")
}

pub const INSERT_TOKEN: &str = r#"
INSERT INTO tokens (id, token, name, description, createdAt, lastUsed, active, usageCount)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
"#;

pub const DISABLE_TOKEN: &str = "UPDATE tokens SET active = 0 WHERE id = ?1";

pub const TOUCH_TOKEN: &str =
    "UPDATE tokens SET lastUsed = ?1, usageCount = COALESCE(usageCount, 0) + 1 WHERE id = ?2";

// ============================================================================
// App queries
// ============================================================================

const APP_COLUMNS: &str = "appId, name, description, createdAt, updatedAt";

pub fn select_apps() -> String {
    format!("SELECT {APP_COLUMNS} FROM apps ORDER BY julianday(createdAt) DESC, rowid ASC")
}

pub fn select_app_by_id() -> String {
    format!("SELECT {APP_COLUMNS} FROM apps WHERE appId = ?1")
}

pub const INSERT_APP: &str = r#"
INSERT INTO apps (appId, name, description, createdAt, updatedAt)
VALUES (?1, ?2, ?3, ?4, ?5)
"#;

pub const UPDATE_APP: &str = r#"
UPDATE apps SET
    name = COALESCE(?1, name),
    description = COALESCE(?2, description),
    updatedAt = ?3
WHERE appId = ?4
"#;

pub const DELETE_APP: &str = "DELETE FROM apps WHERE appId = ?1";

// ============================================================================
// Release queries
// ============================================================================

const RELEASE_COLUMNS: &str = "id, appId, appName, version, description, fileName, filePath, \
     fileSize, tokenName, tokenId, uploadedAt, status, downloadCount, updatedAt";

/// Orders releases newest first, ties in insertion order.
pub const RELEASE_ORDER: &str = "ORDER BY julianday(uploadedAt) DESC, rowid ASC";

/// Builds the release listing query for the given optional conditions.
///
/// Placeholders are numbered in the order the conditions are enabled:
/// app id first, then status.
pub fn select_releases(by_app: bool, by_status: bool) -> String {
    let mut conditions = Vec::new();
    if by_app {
        conditions.push(format!("appId = ?{}", conditions.len() + 1));
    }
    if by_status {
        let n = conditions.len() + 1;
        conditions.push(format!("(status = ?{n} OR status IS NULL AND ?{n} = 'success')"));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {} ", conditions.join(" AND "))
    };

    format!("SELECT {RELEASE_COLUMNS} FROM releases {where_clause}{RELEASE_ORDER}")
}

pub fn select_release_by_id() -> String {
    format!("SELECT {RELEASE_COLUMNS} FROM releases WHERE id = ?1")
}

pub fn select_latest_release() -> String {
    format!("{} LIMIT 1", select_releases(true, true))
}

pub const INSERT_RELEASE: &str = r#"
INSERT INTO releases (
    id, appId, appName, version, description, fileName, filePath, fileSize,
    tokenName, tokenId, uploadedAt, status, downloadCount, updatedAt
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
"#;

pub const UPDATE_RELEASE: &str = r#"
UPDATE releases SET
    version = COALESCE(?1, version),
    description = COALESCE(?2, description),
    updatedAt = ?3
WHERE id = ?4
"#;

pub const INCREMENT_RELEASE_DOWNLOAD: &str =
    "UPDATE releases SET downloadCount = COALESCE(downloadCount, 0) + 1 WHERE id = ?1";

pub const DELETE_RELEASE: &str = "DELETE FROM releases WHERE id = ?1";
