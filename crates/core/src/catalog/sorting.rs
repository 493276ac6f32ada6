//! Ordering rules shared by every backend.
//!
//! All sorts are stable: records with equal timestamps keep their
//! insertion order.

use std::collections::HashMap;

use super::types::{App, Release, Token};

/// Sorts releases by `uploaded_at`, newest first.
pub fn newest_releases_first(releases: &mut [Release]) {
    releases.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
}

/// Sorts apps by `created_at`, newest first.
pub fn newest_apps_first(apps: &mut [App]) {
    apps.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Sorts tokens by `created_at`, newest first.
pub fn newest_tokens_first(tokens: &mut [Token]) {
    tokens.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Picks the newest successful release of every app.
///
/// Releases without an app id are skipped. On equal timestamps the release
/// seen first wins. Results are ordered by the first appearance of each app
/// in `releases`.
pub fn latest_per_app(releases: &[Release]) -> Vec<Release> {
    let mut order: Vec<&str> = Vec::new();
    let mut latest: HashMap<&str, &Release> = HashMap::new();

    for release in releases.iter().filter(|r| r.is_success()) {
        if release.app_id.is_empty() {
            continue;
        }
        let app_id = release.app_id.as_str();
        match latest.get(app_id).map(|current| current.uploaded_at) {
            Some(newest) if newest >= release.uploaded_at => {}
            Some(_) => {
                latest.insert(app_id, release);
            }
            None => {
                order.push(app_id);
                latest.insert(app_id, release);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|app_id| latest.get(app_id).map(|r| (*r).clone()))
        .collect()
}
