//! Uploaded artifact files.
//!
//! Release records only name their artifact (`file_path`); the bytes live
//! in a flat uploads directory managed here.

use std::io;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use fileupdate_core::catalog::{sanitize_file_name, UploadedFile};
use fileupdate_core::clock;
use tokio::fs;
use tokio::task::JoinHandle;

/// Attempts at finding a free stored name before giving up.
const MAX_NAME_ATTEMPTS: i64 = 1000;

/// A flat directory of uploaded artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    uploads_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(uploads_dir: impl Into<PathBuf>) -> Self {
        Self {
            uploads_dir: uploads_dir.into(),
        }
    }

    /// The unique stored name of an upload: `<unix-millis>-<sanitized name>`.
    pub fn stored_name(original: &str, now: DateTime<Utc>) -> String {
        format!("{}-{}", now.timestamp_millis(), sanitize_file_name(original))
    }

    /// Absolute location of a stored artifact.
    pub fn path_of(&self, file_path: &str) -> PathBuf {
        self.uploads_dir.join(file_path)
    }

    /// Copies a local file into the uploads directory under a fresh name.
    pub async fn import(&self, source: &Path) -> io::Result<UploadedFile> {
        let original_name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let original_name = sanitize_file_name(&original_name);

        fs::create_dir_all(&self.uploads_dir).await?;
        let mut input = fs::File::open(source).await?;

        let now = clock::now();
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let stored_name = Self::stored_name(&original_name, now + Duration::milliseconds(attempt));
            let target = self.uploads_dir.join(&stored_name);

            let mut output = match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&target)
                .await
            {
                Ok(file) => file,
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(err),
            };

            let copied = match tokio::io::copy(&mut input, &mut output).await {
                Ok(size) => output.sync_all().await.map(|()| size),
                Err(err) => Err(err),
            };
            let size = match copied {
                Ok(size) => size,
                Err(err) => {
                    drop(output);
                    if let Err(cleanup) = fs::remove_file(&target).await {
                        tracing::warn!(
                            path = %target.display(),
                            error = %cleanup,
                            "Failed to remove partial artifact"
                        );
                    }
                    return Err(err);
                }
            };

            tracing::debug!(
                source = %source.display(),
                stored_name = %stored_name,
                size,
                "Imported artifact"
            );

            return Ok(UploadedFile {
                original_name,
                stored_name,
                size,
            });
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free stored name for {original_name}"),
        ))
    }

    /// Removes a stored artifact, best-effort.
    ///
    /// Only bare file names inside the uploads directory are accepted.
    /// Returns whether a file was removed; failures are logged, not raised.
    pub async fn remove(&self, file_path: &str) -> bool {
        if !is_single_component(file_path) {
            tracing::warn!(file_path, "Refusing to remove artifact outside uploads dir");
            return false;
        }

        match fs::remove_file(self.path_of(file_path)).await {
            Ok(()) => {
                tracing::debug!(file_path, "Removed artifact");
                true
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(file_path, "Artifact already gone");
                false
            }
            Err(err) => {
                tracing::warn!(file_path, error = %err, "Failed to remove artifact");
                false
            }
        }
    }

    /// Removes a stored artifact in the background.
    pub fn spawn_remove(&self, file_path: impl Into<String>) -> JoinHandle<bool> {
        let store = self.clone();
        let file_path = file_path.into();
        tokio::spawn(async move { store.remove(&file_path).await })
    }
}

fn is_single_component(file_path: &str) -> bool {
    let mut components = Path::new(file_path).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
