//! Command implementations.

mod init;
mod invite;
mod project;
mod recipients;
mod requests;
mod status;

pub use init::InitArgs;
pub use invite::InviteCommands;
pub use project::ProjectCommands;
pub use recipients::RecipientCommands;
pub use requests::RequestCommands;
pub use status::status;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use envlock::store::MetadataStore;
use envlock::{Envlock, ProjectConfig};

use crate::keys::{self, DeviceKey};

/// The facade over whichever backend the project config selects.
pub type ProjectEnvlock = Envlock<Arc<dyn MetadataStore>>;

/// Settings shared by every command.
pub struct Context {
    project_dir: PathBuf,
    key_name: String,
    config_dir: Option<PathBuf>,
}

impl Context {
    pub fn new(project_dir: PathBuf, key_name: String, config_dir: Option<PathBuf>) -> Self {
        Self {
            project_dir,
            key_name,
            config_dir,
        }
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Path of the selected local key.
    pub fn key_path(&self) -> Result<PathBuf> {
        Ok(keys::key_path(self.config_dir.as_deref(), &self.key_name)?)
    }

    /// Load the selected local key.
    pub fn load_key(&self) -> Result<DeviceKey> {
        let path = self.key_path()?;
        DeviceKey::load(&path).with_context(|| {
            format!(
                "load local key ({}) (run `envlock init` first)",
                path.display()
            )
        })
    }

    /// Load the project config and open its store.
    pub fn open_project(&self) -> Result<(ProjectConfig, ProjectEnvlock)> {
        let config = ProjectConfig::load(&self.project_dir)?;
        let envlock = self.envlock_for(&config)?;
        Ok((config, envlock))
    }

    pub fn envlock_for(&self, config: &ProjectConfig) -> Result<ProjectEnvlock> {
        let store = config.open_store(&self.project_dir)?;
        Ok(Envlock::new(store, config.envlock_config()))
    }
}

/// Timestamps as printed by every command.
pub(crate) fn fmt_time(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Trimmed text, or `None` when blank.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
