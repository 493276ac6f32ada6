use anyhow::{bail, Result};
use fileupdate_core::catalog::{ReleaseFilter, ReleasePatch};

use super::{to_json, Context};

/// Release commands.
#[derive(Debug, clap::Parser)]
pub struct ReleasesCommand {
    #[command(subcommand)]
    pub action: ReleasesAction,
}

#[derive(Debug, clap::Subcommand)]
pub enum ReleasesAction {
    /// List releases, newest first
    List {
        /// Only releases of this app
        #[arg(long = "app")]
        app_id: Option<String>,
        /// Only releases with this status (unset counts as `success`)
        #[arg(long)]
        status: Option<String>,
    },

    /// Show the newest successful release of an app, or of every app
    Latest {
        /// App identifier; omit to list one release per app
        app_id: Option<String>,
    },

    /// Show one release
    Show { id: String },

    /// Change a release's version or description
    Edit {
        id: String,
        #[arg(long)]
        version: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },

    /// Delete a release and its stored file
    Delete { id: String },

    /// Count a download and print where the file is stored
    Download { id: String },
}

impl ReleasesCommand {
    pub async fn run(self, ctx: &Context) -> Result<serde_json::Value> {
        let storage = &ctx.storage;

        match self.action {
            ReleasesAction::List { app_id, status } => {
                let filter = ReleaseFilter { app_id, status };
                to_json(&storage.list_releases(&filter).await?)
            }
            ReleasesAction::Latest { app_id: None } => to_json(&storage.latest_per_app().await?),
            ReleasesAction::Latest {
                app_id: Some(app_id),
            } => match storage.find_latest_release(&app_id).await? {
                Some(release) => to_json(&release),
                None => bail!("No release found for app: {app_id}"),
            },
            ReleasesAction::Show { id } => match storage.find_release_by_id(&id).await? {
                Some(release) => to_json(&release),
                None => bail!("Release not found: {id}"),
            },
            ReleasesAction::Edit {
                id,
                version,
                description,
            } => {
                let patch = ReleasePatch {
                    version: version.map(|v| v.trim().to_string()),
                    description: description.map(|d| d.trim().to_string()),
                };
                if patch.is_empty() {
                    bail!("Nothing to update: pass --version or --description");
                }

                match storage.update_release(&id, &patch).await? {
                    Some(release) => to_json(&release),
                    None => bail!("Release not found: {id}"),
                }
            }
            ReleasesAction::Delete { id } => {
                let Some(release) = storage.delete_release(&id).await? else {
                    bail!("Release not found: {id}");
                };
                // Removal has to finish before the process exits.
                ctx.artifacts.remove(&release.file_path).await;
                tracing::info!(release_id = %release.id, "Deleted release");
                to_json(&release)
            }
            ReleasesAction::Download { id } => {
                let Some(release) = storage.increment_release_download(&id).await? else {
                    bail!("Release not found: {id}");
                };
                let path = ctx.artifacts.path_of(&release.file_path);
                Ok(serde_json::json!({
                    "release": to_json(&release)?,
                    "path": path.display().to_string(),
                }))
            }
        }
    }
}
