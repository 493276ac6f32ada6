use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};
use fileupdate_core::catalog::{PublishBatch, Publisher, UploadedFile};

use super::{to_json, Context};

/// Publish local files as releases of an app.
///
/// Each file becomes its own release record; all of them share the
/// version, description and upload time.
#[derive(Debug, clap::Parser)]
pub struct PublishCommand {
    /// App identifier
    pub app_id: String,

    /// Files to publish
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Version label (defaults to "unspecified")
    #[arg(long)]
    pub version: Option<String>,

    #[arg(long)]
    pub description: Option<String>,
}

impl PublishCommand {
    pub async fn run(self, ctx: &Context) -> Result<serde_json::Value> {
        let Some(app) = ctx.storage.find_app_by_id(&self.app_id).await? else {
            bail!("App not found: {}", self.app_id);
        };

        let mut uploaded: Vec<UploadedFile> = Vec::with_capacity(self.files.len());
        for file in &self.files {
            match ctx.artifacts.import(file).await {
                Ok(upload) => uploaded.push(upload),
                Err(err) => {
                    discard(ctx, &uploaded).await;
                    return Err(err).with_context(|| format!("Failed to import {}", file.display()));
                }
            }
        }

        let mut batch = PublishBatch::new(&app, Publisher::Manual);
        if let Some(version) = self.version {
            batch = batch.with_version(version.trim());
        }
        if let Some(description) = self.description {
            batch = batch.with_description(description.trim());
        }
        for upload in &uploaded {
            batch = batch.with_file(upload.clone());
        }

        match ctx.storage.publish(batch).await {
            Ok(releases) => to_json(&releases),
            Err(err) => {
                discard(ctx, &uploaded).await;
                Err(err).context("Failed to record releases")
            }
        }
    }
}

/// Removes files imported by a publish that did not complete.
async fn discard(ctx: &Context, uploaded: &[UploadedFile]) {
    for upload in uploaded {
        ctx.artifacts.remove(&upload.stored_name).await;
    }
}
