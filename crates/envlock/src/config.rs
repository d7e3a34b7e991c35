//! Project configuration.
//!
//! A project is a directory containing `.envlock/project.toml`:
//!
//! ```toml
//! version = 1
//! app_name = "myapp"
//! prefix = "envlock/myapp"
//!
//! [backend]
//! kind = "sqlite"
//! path = ".envlock/metadata.db"
//!
//! [enrollment]
//! invite_ttl_secs = 900
//! ```
//!
//! Relative backend paths resolve against the project root.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Duration;
use envlock_store::{FsObjectStore, MetadataStore, ProjectStore, SqliteObjectStore};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EnvlockError, Result};
use crate::service::EnvlockConfig;

/// Directory holding project state, relative to the project root.
pub const PROJECT_DIR: &str = ".envlock";

/// Config file name inside [`PROJECT_DIR`].
pub const PROJECT_FILE: &str = "project.toml";

/// Default invite lifetime: 15 minutes.
pub const DEFAULT_INVITE_TTL_SECS: u64 = 15 * 60;

const CONFIG_VERSION: u32 = 1;
// Largest whole-second value a chrono Duration can hold.
const MAX_TTL_SECS: i64 = i64::MAX / 1_000;
const DEFAULT_FS_PATH: &str = ".envlock/store";
const DEFAULT_SQLITE_PATH: &str = ".envlock/metadata.db";

/// Contents of `project.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default = "config_version")]
    pub version: u32,
    pub app_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prefix: String,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub enrollment: EnrollmentSettings,
}

/// Where enrollment metadata is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    /// One JSON file per record under a directory.
    Fs {
        #[serde(default = "default_fs_path")]
        path: PathBuf,
    },
    /// A SQLite database file.
    Sqlite {
        #[serde(default = "default_sqlite_path")]
        path: PathBuf,
    },
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Fs {
            path: default_fs_path(),
        }
    }
}

impl BackendConfig {
    /// The filesystem backend at its default location.
    pub fn fs() -> Self {
        Self::default()
    }

    /// The SQLite backend at its default location.
    pub fn sqlite() -> Self {
        BackendConfig::Sqlite {
            path: default_sqlite_path(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BackendConfig::Fs { .. } => "fs",
            BackendConfig::Sqlite { .. } => "sqlite",
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            BackendConfig::Fs { path } | BackendConfig::Sqlite { path } => path,
        }
    }

    /// Replace the backend path, keeping the kind.
    pub fn with_path(self, path: impl Into<PathBuf>) -> Self {
        match self {
            BackendConfig::Fs { .. } => BackendConfig::Fs { path: path.into() },
            BackendConfig::Sqlite { .. } => BackendConfig::Sqlite { path: path.into() },
        }
    }
}

/// The `[enrollment]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentSettings {
    #[serde(default = "default_invite_ttl_secs")]
    pub invite_ttl_secs: u64,
}

impl Default for EnrollmentSettings {
    fn default() -> Self {
        Self {
            invite_ttl_secs: DEFAULT_INVITE_TTL_SECS,
        }
    }
}

fn config_version() -> u32 {
    CONFIG_VERSION
}

fn default_fs_path() -> PathBuf {
    PathBuf::from(DEFAULT_FS_PATH)
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from(DEFAULT_SQLITE_PATH)
}

fn default_invite_ttl_secs() -> u64 {
    DEFAULT_INVITE_TTL_SECS
}

/// Default object prefix for an app.
pub fn default_prefix(app_name: &str) -> String {
    format!("envlock/{}", app_name.trim())
}

impl ProjectConfig {
    /// A config for `app_name` with default prefix, backend and settings.
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            version: CONFIG_VERSION,
            app_name: app_name.into().trim().to_string(),
            prefix: String::new(),
            backend: BackendConfig::default(),
            enrollment: EnrollmentSettings::default(),
        }
    }

    /// Path of the config file under `root`.
    pub fn path(root: impl AsRef<Path>) -> PathBuf {
        root.as_ref().join(PROJECT_DIR).join(PROJECT_FILE)
    }

    /// Load and validate the config of the project at `root`.
    pub fn load(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let path = Self::path(root);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(EnvlockError::ProjectNotFound(root.to_path_buf()))
            }
            Err(source) => return Err(EnvlockError::Io { path, source }),
        };
        let config: ProjectConfig =
            toml::from_str(&text).map_err(|source| EnvlockError::ConfigParse {
                path: path.clone(),
                source,
            })?;
        config.validate()?;
        debug!(path = %path.display(), app = %config.app_name, "loaded project config");
        Ok(config)
    }

    /// Write the config under `root`, creating `.envlock/` if needed.
    ///
    /// Fails with [`EnvlockError::ProjectExists`] if a config is already
    /// present and `force` is false.
    pub fn save(&self, root: impl AsRef<Path>, force: bool) -> Result<PathBuf> {
        self.validate()?;
        let path = Self::path(root);
        if path.exists() && !force {
            return Err(EnvlockError::ProjectExists(path));
        }
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|source| EnvlockError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let text = toml::to_string_pretty(self)?;
        fs::write(&path, text).map_err(|source| EnvlockError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Check fields that serde cannot.
    pub fn validate(&self) -> Result<()> {
        if self.app_name.trim().is_empty() {
            return Err(EnvlockError::InvalidConfig("app_name is required".into()));
        }
        if self.version > CONFIG_VERSION {
            return Err(EnvlockError::InvalidConfig(format!(
                "unsupported config version {}",
                self.version
            )));
        }
        if self.enrollment.invite_ttl_secs == 0 {
            return Err(EnvlockError::InvalidConfig(
                "enrollment.invite_ttl_secs must be greater than zero".into(),
            ));
        }
        if self.backend.path().as_os_str().is_empty() {
            return Err(EnvlockError::InvalidConfig("backend path is required".into()));
        }
        Ok(())
    }

    /// The object prefix, defaulting to `envlock/<app_name>`.
    pub fn effective_prefix(&self) -> String {
        match self.prefix.trim() {
            "" => default_prefix(&self.app_name),
            prefix => prefix.to_string(),
        }
    }

    /// Backend path resolved against the project root.
    pub fn backend_path(&self, root: impl AsRef<Path>) -> PathBuf {
        root.as_ref().join(self.backend.path())
    }

    /// Settings for [`crate::Envlock`].
    pub fn envlock_config(&self) -> EnvlockConfig {
        let secs = i64::try_from(self.enrollment.invite_ttl_secs)
            .unwrap_or(i64::MAX)
            .min(MAX_TTL_SECS);
        EnvlockConfig {
            invite_ttl: Duration::seconds(secs),
        }
    }

    /// Open the configured metadata store for the project at `root`.
    pub fn open_store(&self, root: impl AsRef<Path>) -> Result<Arc<dyn MetadataStore>> {
        let path = self.backend_path(root);
        let prefix = self.effective_prefix();
        debug!(backend = self.backend.kind(), path = %path.display(), %prefix, "opening store");

        let store: Arc<dyn MetadataStore> = match self.backend {
            BackendConfig::Fs { .. } => Arc::new(ProjectStore::new(FsObjectStore::new(path), prefix)),
            BackendConfig::Sqlite { .. } => {
                if let Some(dir) = path.parent() {
                    fs::create_dir_all(dir).map_err(|source| EnvlockError::Io {
                        path: dir.to_path_buf(),
                        source,
                    })?;
                }
                Arc::new(ProjectStore::new(SqliteObjectStore::open(&path)?, prefix))
            }
        };
        Ok(store)
    }
}
