use thiserror::Error;

/// Errors raised when validating input before it reaches storage.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("App ID cannot be empty")]
    EmptyAppId,
    #[error("App ID may only contain letters, digits, '-' and '_': {0}")]
    InvalidAppId(String),
    #[error("App name cannot be empty")]
    EmptyName,
    #[error("A publish needs at least one file")]
    NoFiles,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        assert_eq!(ValidationError::EmptyAppId.to_string(), "App ID cannot be empty");
        assert_eq!(
            ValidationError::InvalidAppId("a b".to_string()).to_string(),
            "App ID may only contain letters, digits, '-' and '_': a b"
        );
        assert_eq!(
            ValidationError::NoFiles.to_string(),
            "A publish needs at least one file"
        );
    }
}
