mod error;
mod filter;
mod publish;
mod sorting;
mod types;
mod validation;

pub use error::ValidationError;
pub use filter::ReleaseFilter;
pub use publish::{PublishBatch, Publisher, UploadedFile};
pub use sorting::{latest_per_app, newest_apps_first, newest_releases_first, newest_tokens_first};
pub use types::{
    App, AppPatch, Release, ReleasePatch, Token, LEGACY_MANUAL_PUBLISHER, MANUAL_PUBLISHER,
    STATUS_SUCCESS, UNSPECIFIED_VERSION,
};
pub use validation::{sanitize_file_name, validate_app_id, validate_new_app};
