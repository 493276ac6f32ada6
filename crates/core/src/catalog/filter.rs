use serde::{Deserialize, Serialize};

use super::types::{Release, STATUS_SUCCESS};

/// Filters accepted by `list_releases`.
///
/// An empty string behaves like an absent filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseFilter {
    pub app_id: Option<String>,
    pub status: Option<String>,
}

impl ReleaseFilter {
    /// Matches every release.
    pub fn all() -> Self {
        Self::default()
    }

    /// Matches releases of one app, any status.
    pub fn for_app(app_id: impl Into<String>) -> Self {
        Self {
            app_id: Some(app_id.into()),
            status: None,
        }
    }

    /// Matches successful releases of one app.
    pub fn successful_for(app_id: impl Into<String>) -> Self {
        Self::for_app(app_id).with_status(STATUS_SUCCESS)
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// The app filter, if one is set.
    pub fn app_id(&self) -> Option<&str> {
        self.app_id.as_deref().filter(|s| !s.is_empty())
    }

    /// The status filter, if one is set.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref().filter(|s| !s.is_empty())
    }

    /// Returns true if `release` passes both filters.
    ///
    /// The status filter compares against the effective status, so a
    /// release without a status matches a `"success"` filter.
    pub fn matches(&self, release: &Release) -> bool {
        if let Some(app_id) = self.app_id() {
            if release.app_id != app_id {
                return false;
            }
        }
        if let Some(status) = self.status() {
            if release.effective_status() != status {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::parse_timestamp;

    fn release(app_id: &str, status: Option<&str>) -> Release {
        Release::new(app_id, app_id, "a.zip", parse_timestamp("2024-01-01T00:00:00Z").unwrap())
            .with_status(status)
    }

    #[test]
    fn test_all_matches_everything() {
        let filter = ReleaseFilter::all();
        assert!(filter.matches(&release("a", Some("success"))));
        assert!(filter.matches(&release("b", Some("failed"))));
        assert!(filter.matches(&release("c", None)));
    }

    #[test]
    fn test_app_filter_is_exact() {
        let filter = ReleaseFilter::for_app("demo");
        assert!(filter.matches(&release("demo", None)));
        assert!(!filter.matches(&release("demo2", None)));
        assert!(!filter.matches(&release("Demo", None)));
    }

    #[test]
    fn test_success_filter_includes_unset_status() {
        let filter = ReleaseFilter::all().with_status(STATUS_SUCCESS);
        assert!(filter.matches(&release("a", Some("success"))));
        assert!(filter.matches(&release("a", None)));
        assert!(!filter.matches(&release("a", Some("failed"))));
    }

    #[test]
    fn test_other_status_filter_excludes_unset_status() {
        let filter = ReleaseFilter::all().with_status("failed");
        assert!(filter.matches(&release("a", Some("failed"))));
        assert!(!filter.matches(&release("a", None)));
    }

    #[test]
    fn test_empty_strings_are_ignored() {
        let filter = ReleaseFilter {
            app_id: Some(String::new()),
            status: Some(String::new()),
        };
        assert_eq!(filter.app_id(), None);
        assert_eq!(filter.status(), None);
        assert!(filter.matches(&release("anything", Some("failed"))));
    }

    #[test]
    fn test_successful_for() {
        let filter = ReleaseFilter::successful_for("demo");
        assert_eq!(filter.app_id(), Some("demo"));
        assert_eq!(filter.status(), Some(STATUS_SUCCESS));
    }
}
