//! Input checks performed by callers before they hand records to storage.
//!
//! Storage trusts its input; duplicate detection is done by looking the app
//! up first.

use super::error::ValidationError;

/// Checks that an app id is non-empty and matches `[A-Za-z0-9_-]+`.
pub fn validate_app_id(app_id: &str) -> Result<(), ValidationError> {
    if app_id.is_empty() {
        return Err(ValidationError::EmptyAppId);
    }
    let valid = app_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(ValidationError::InvalidAppId(app_id.to_string()));
    }
    Ok(())
}

/// Checks the fields required to create an app.
pub fn validate_new_app(app_id: &str, name: &str) -> Result<(), ValidationError> {
    validate_app_id(app_id)?;
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(())
}

/// Reduces an uploaded file name to a safe, single path component.
///
/// Directory parts are dropped, control characters become `_`, and an
/// empty or dot-only result falls back to `"file"`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_control() { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}
