use anyhow::{bail, Result};
use fileupdate_core::catalog::{validate_new_app, App, AppPatch};

use super::{to_json, Context};

/// App management commands.
#[derive(Debug, clap::Parser)]
pub struct AppsCommand {
    #[command(subcommand)]
    pub action: AppsAction,
}

#[derive(Debug, clap::Subcommand)]
pub enum AppsAction {
    /// List all apps, newest first
    List,

    /// Show one app
    Show {
        /// App identifier
        app_id: String,
    },

    /// Register a new app
    Create {
        /// App identifier (letters, digits, `-` and `_`)
        app_id: String,
        /// Display name
        name: String,
        #[arg(long)]
        description: Option<String>,
    },

    /// Change an app's name or description
    Update {
        app_id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },

    /// Delete an app record (its releases are kept)
    Delete { app_id: String },
}

impl AppsCommand {
    pub async fn run(self, ctx: &Context) -> Result<serde_json::Value> {
        let storage = &ctx.storage;

        match self.action {
            AppsAction::List => to_json(&storage.list_apps().await?),
            AppsAction::Show { app_id } => match storage.find_app_by_id(&app_id).await? {
                Some(app) => to_json(&app),
                None => bail!("App not found: {app_id}"),
            },
            AppsAction::Create {
                app_id,
                name,
                description,
            } => {
                let app_id = app_id.trim();
                let name = name.trim();
                validate_new_app(app_id, name)?;
                if storage.find_app_by_id(app_id).await?.is_some() {
                    bail!("App already exists: {app_id}");
                }

                let mut app = App::new(app_id, name);
                if let Some(description) = description.filter(|d| !d.trim().is_empty()) {
                    app = app.with_description(description.trim());
                }
                to_json(&storage.create_app(&app).await?)
            }
            AppsAction::Update {
                app_id,
                name,
                description,
            } => {
                let mut patch = AppPatch::default();
                if let Some(name) = name {
                    if name.trim().is_empty() {
                        bail!("App name cannot be blank");
                    }
                    patch = patch.name(name.trim());
                }
                if let Some(description) = description {
                    patch = patch.description(description.trim());
                }

                match storage.update_app(&app_id, &patch).await? {
                    Some(app) => to_json(&app),
                    None => bail!("App not found: {app_id}"),
                }
            }
            AppsAction::Delete { app_id } => {
                if !storage.delete_app(&app_id).await? {
                    bail!("App not found: {app_id}");
                }
                tracing::info!(app_id = %app_id, "Deleted app");
                Ok(serde_json::json!({ "deleted": app_id }))
            }
        }
    }
}
