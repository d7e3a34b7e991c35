//! `envlock project`

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand, ValueEnum};
use envlock::{BackendConfig, ProjectConfig, RecipientChange};

use super::{non_empty, Context};
use crate::duration::format_secs;

/// Project configuration commands
#[derive(Subcommand)]
pub enum ProjectCommands {
    /// Create the project config and add this device as a recipient
    Init(ProjectInitArgs),

    /// Print the project config
    Show,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum BackendKind {
    /// One JSON file per record
    #[default]
    Fs,
    /// SQLite database
    Sqlite,
}

/// Arguments for project initialization
#[derive(Args)]
pub struct ProjectInitArgs {
    /// App name (defaults to the project directory name)
    #[arg(long)]
    pub app: Option<String>,

    /// Object prefix (defaults to envlock/<app>)
    #[arg(long)]
    pub prefix: Option<String>,

    /// Metadata backend
    #[arg(long, value_enum, default_value_t = BackendKind::Fs)]
    pub backend: BackendKind,

    /// Backend path, relative to the project directory
    #[arg(long)]
    pub store_path: Option<PathBuf>,

    /// Device name for the local recipient (defaults to the key's name)
    #[arg(long)]
    pub name: Option<String>,

    /// Overwrite an existing project config
    #[arg(long)]
    pub force: bool,
}

impl ProjectCommands {
    pub async fn execute(self, ctx: &Context) -> Result<()> {
        match self {
            ProjectCommands::Init(args) => args.execute(ctx).await,
            ProjectCommands::Show => show(ctx),
        }
    }
}

impl ProjectInitArgs {
    async fn execute(self, ctx: &Context) -> Result<()> {
        let key = ctx.load_key()?;

        let app = match non_empty(self.app) {
            Some(app) => app,
            None => infer_app_name(ctx)?,
        };
        let mut config = ProjectConfig::new(app);
        if let Some(prefix) = non_empty(self.prefix) {
            config.prefix = prefix;
        }
        config.backend = match self.backend {
            BackendKind::Fs => BackendConfig::fs(),
            BackendKind::Sqlite => BackendConfig::sqlite(),
        };
        if let Some(path) = self.store_path {
            config.backend = config.backend.with_path(path);
        }

        let path = config.save(ctx.project_dir(), self.force)?;
        let envlock = ctx.envlock_for(&config)?;

        let device = key.device(self.name.as_deref().unwrap_or_default());
        let change = envlock
            .bootstrap_recipient(&device)
            .await
            .context("add local device to recipients")?;

        println!("Project initialized: {}", path.display());
        match change {
            RecipientChange::Added(recipient) => println!(
                "Added local device recipient: {} ({})",
                recipient.name, recipient.fingerprint
            ),
            RecipientChange::AlreadyPresent => println!(
                "Local device already a recipient: {} ({})",
                device.name, device.fingerprint
            ),
        }
        Ok(())
    }
}

fn infer_app_name(ctx: &Context) -> Result<String> {
    let dir = ctx
        .project_dir()
        .canonicalize()
        .with_context(|| format!("resolve {}", ctx.project_dir().display()))?;
    dir.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .filter(|name| !name.is_empty())
        .context("could not infer an app name from the project directory (pass --app)")
}

fn show(ctx: &Context) -> Result<()> {
    let config = ProjectConfig::load(ctx.project_dir())?;

    println!("File: {}", ProjectConfig::path(ctx.project_dir()).display());
    println!("Version: {}", config.version);
    println!("App: {}", config.app_name);
    println!("Prefix: {}", config.effective_prefix());
    println!(
        "Backend: {} ({})",
        config.backend.kind(),
        config.backend.path().display()
    );
    println!(
        "Invite TTL: {}",
        format_secs(config.enrollment.invite_ttl_secs)
    );
    Ok(())
}
