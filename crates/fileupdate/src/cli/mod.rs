//! Admin command line.
//!
//! Every command prints its result as pretty JSON on stdout. Not-found
//! outcomes and validation failures are errors, so the process exits
//! non-zero.

mod apps;
mod publish;
mod releases;
mod tokens;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use serde::Serialize;

use crate::artifacts::ArtifactStore;
use crate::config::Config;
use crate::storage::Storage;

/// fileupdate - Publish and distribute application releases
#[derive(Debug, clap::Parser)]
#[command(name = "fileupdate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: Global,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Deployment root; data files and uploads live beneath it
    #[arg(long, global = true, default_value = ".", env = "FILEUPDATE_ROOT")]
    pub root: PathBuf,

    /// Storage override file (defaults to <root>/config/database.json)
    #[arg(long, global = true, env = "FILEUPDATE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Manage apps
    Apps(apps::AppsCommand),

    /// Manage publish tokens
    Tokens(tokens::TokensCommand),

    /// Inspect and edit releases
    Releases(releases::ReleasesCommand),

    /// Publish local files as releases of an app
    Publish(publish::PublishCommand),
}

/// What every command runs against.
#[derive(Debug, Clone)]
pub struct Context {
    pub storage: Storage,
    pub artifacts: ArtifactStore,
}

impl Context {
    /// Loads configuration and opens storage for the deployment in `global.root`.
    pub async fn open(global: &Global) -> Result<Self> {
        let config = Config::load(&global.root, global.config.as_deref())
            .context("Failed to load configuration")?;
        let storage = Storage::open(&config.storage)
            .await
            .context("Failed to open storage")?;

        Ok(Self {
            storage,
            artifacts: ArtifactStore::new(config.uploads_dir),
        })
    }
}

/// Runs a parsed command line against its deployment.
pub async fn run(cli: Cli) -> Result<serde_json::Value> {
    let ctx = Context::open(&cli.global).await?;
    execute(cli.command, &ctx).await
}

/// Runs one command against an opened context.
pub async fn execute(command: Commands, ctx: &Context) -> Result<serde_json::Value> {
    match command {
        Commands::Apps(cmd) => cmd.run(ctx).await,
        Commands::Tokens(cmd) => cmd.run(ctx).await,
        Commands::Releases(cmd) => cmd.run(ctx).await,
        Commands::Publish(cmd) => cmd.run(ctx).await,
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value).context("Failed to encode output")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    async fn run_in(root: &std::path::Path, args: &[&str]) -> Result<serde_json::Value> {
        let root = root.to_string_lossy().into_owned();
        let mut argv = vec!["fileupdate", "--root", root.as_str()];
        argv.extend_from_slice(args);
        run(Cli::try_parse_from(argv)?).await
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[tokio::test]
    async fn test_app_lifecycle() {
        let dir = tempfile::tempdir().unwrap();

        let created = run_in(dir.path(), &["apps", "create", "demo", "Demo App"])
            .await
            .unwrap();
        assert_eq!(created["appId"], "demo");

        let updated = run_in(
            dir.path(),
            &["apps", "update", "demo", "--description", "Desktop client"],
        )
        .await
        .unwrap();
        assert_eq!(updated["name"], "Demo App");
        assert_eq!(updated["description"], "Desktop client");

        let listed = run_in(dir.path(), &["apps", "list"]).await.unwrap();
        assert_eq!(listed.as_array().unwrap().len(), 1);

        run_in(dir.path(), &["apps", "delete", "demo"]).await.unwrap();
        assert!(run_in(dir.path(), &["apps", "show", "demo"]).await.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_and_invalid_apps_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        run_in(dir.path(), &["apps", "create", "demo", "Demo"])
            .await
            .unwrap();

        assert!(run_in(dir.path(), &["apps", "create", "demo", "Again"])
            .await
            .is_err());
        assert!(run_in(dir.path(), &["apps", "create", "bad id", "Bad"])
            .await
            .is_err());
        assert!(run_in(dir.path(), &["apps", "create", "blank", "  "])
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_tokens_are_masked_in_listing() {
        let dir = tempfile::tempdir().unwrap();

        let created = run_in(dir.path(), &["tokens", "create", "ci"]).await.unwrap();
        let credential = created["token"].as_str().unwrap().to_string();
        assert!(credential.len() > 20);

        let listed = run_in(dir.path(), &["tokens", "list"]).await.unwrap();
        let masked = listed[0]["token"].as_str().unwrap();
        assert_eq!(masked, format!("{}...", &credential[..20]));

        let id = created["id"].as_str().unwrap();
        let disabled = run_in(dir.path(), &["tokens", "disable", id]).await.unwrap();
        assert_eq!(disabled["active"], false);
    }

    #[tokio::test]
    async fn test_publish_download_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("setup.exe");
        std::fs::write(&artifact, b"binary").unwrap();
        let artifact = artifact.to_string_lossy().into_owned();
        run_in(dir.path(), &["apps", "create", "demo", "Demo"])
            .await
            .unwrap();

        let published = run_in(
            dir.path(),
            &["publish", "demo", artifact.as_str(), "--version", "1.0.0"],
        )
        .await
        .unwrap();
        let release = &published[0];
        assert_eq!(release["version"], "1.0.0");
        assert_eq!(release["tokenName"], "manual");
        assert_eq!(release["fileSize"], 6);
        let id = release["id"].as_str().unwrap().to_string();
        let stored = dir
            .path()
            .join("uploads")
            .join(release["filePath"].as_str().unwrap());
        assert!(stored.exists());

        let latest = run_in(dir.path(), &["releases", "latest", "demo"])
            .await
            .unwrap();
        assert_eq!(latest["id"], id.as_str());

        let download = run_in(dir.path(), &["releases", "download", &id])
            .await
            .unwrap();
        assert_eq!(download["release"]["downloadCount"], 1);

        let edited = run_in(
            dir.path(),
            &["releases", "edit", &id, "--description", "First build"],
        )
        .await
        .unwrap();
        assert_eq!(edited["description"], "First build");
        assert_eq!(edited["version"], "1.0.0");

        assert!(run_in(dir.path(), &["releases", "edit", &id]).await.is_err());

        run_in(dir.path(), &["releases", "delete", &id]).await.unwrap();
        assert!(!stored.exists());
        assert!(run_in(dir.path(), &["releases", "show", &id]).await.is_err());
    }

    #[tokio::test]
    async fn test_publish_to_unknown_app_fails() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("setup.exe");
        std::fs::write(&artifact, b"binary").unwrap();
        let artifact = artifact.to_string_lossy().into_owned();

        let result = run_in(dir.path(), &["publish", "missing", artifact.as_str()]).await;

        assert!(result.is_err());
        assert!(!dir.path().join("uploads").exists());
    }

    #[tokio::test]
    async fn test_sqlite_driver_from_override() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("config")).unwrap();
        std::fs::write(
            dir.path().join("config").join("database.json"),
            r#"{"driver": "sqlite"}"#,
        )
        .unwrap();

        run_in(dir.path(), &["apps", "create", "demo", "Demo"])
            .await
            .unwrap();

        assert!(dir.path().join("data").join("fileupdate.sqlite").exists());
        assert!(!dir.path().join("apps.json").exists());

        let global = Global {
            root: dir.path().to_path_buf(),
            config: None,
        };
        let ctx = Context::open(&global).await.unwrap();
        assert_eq!(ctx.storage.driver(), fileupdate_core::config::Driver::Sqlite);
    }
}
