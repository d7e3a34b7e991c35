//! Local device keys.
//!
//! Every machine holds one age X25519 identity per key name, stored under
//! the user config directory:
//!
//! ```text
//! <config_dir>/envlock/keys/<key-name>.agekey
//!
//! # envlock-device: alice-laptop
//! AGE-SECRET-KEY-1...
//! ```
//!
//! The header line is optional; keys generated by other age tooling load
//! with an empty device name.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use age::secrecy::ExposeSecret;
use age::x25519;
use envlock::DeviceIdentity;
use thiserror::Error;

/// Key name used when none is given.
pub const DEFAULT_KEY_NAME: &str = "default";

const KEY_EXTENSION: &str = "agekey";
const DEVICE_HEADER: &str = "# envlock-device:";
const SECRET_PREFIX: &str = "AGE-SECRET-KEY-";
const FALLBACK_DEVICE_NAME: &str = "device";

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("key name must not contain path separators: {0:?}")]
    InvalidName(String),

    #[error("could not determine the user config directory")]
    NoConfigDir,

    #[error("key already exists at {} (use --force to overwrite)", .0.display())]
    Exists(PathBuf),

    #[error("no AGE-SECRET-KEY found in {}", .0.display())]
    MissingSecret(PathBuf),

    #[error("invalid age identity in {}: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("invalid recipient public key: {0}")]
    InvalidRecipient(String),

    #[error("I/O error on {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
}

pub type Result<T> = std::result::Result<T, KeyError>;

/// Location of the key called `key_name`.
///
/// `config_dir` overrides the platform config directory. An empty name
/// means [`DEFAULT_KEY_NAME`].
pub fn key_path(config_dir: Option<&Path>, key_name: &str) -> Result<PathBuf> {
    let name = match key_name.trim() {
        "" => DEFAULT_KEY_NAME,
        name => name,
    };
    if name.contains(['/', '\\']) || name.contains(std::path::MAIN_SEPARATOR) || name == ".." {
        return Err(KeyError::InvalidName(name.to_string()));
    }

    let base = match config_dir {
        Some(dir) => dir.to_path_buf(),
        None => dirs::config_dir().ok_or(KeyError::NoConfigDir)?,
    };
    Ok(base
        .join("envlock")
        .join("keys")
        .join(format!("{name}.{KEY_EXTENSION}")))
}

/// Best-effort name for this machine: the hostname from the environment,
/// else `device`.
pub fn default_device_name() -> String {
    ["HOSTNAME", "COMPUTERNAME"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .map(|name| name.trim().to_string())
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_DEVICE_NAME.to_string())
}

/// Parse a public key as an age X25519 recipient, returning its canonical form.
pub fn validate_recipient(public_key: &str) -> Result<String> {
    public_key
        .trim()
        .parse::<x25519::Recipient>()
        .map(|recipient| recipient.to_string())
        .map_err(|reason| KeyError::InvalidRecipient(reason.to_string()))
}

/// An age identity plus the device name recorded next to it.
pub struct DeviceKey {
    identity: x25519::Identity,
    device_name: String,
}

impl fmt::Debug for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceKey")
            .field("device_name", &self.device_name)
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

impl DeviceKey {
    /// Generate a fresh identity for `device_name`.
    pub fn generate(device_name: &str) -> Self {
        Self {
            identity: x25519::Identity::generate(),
            device_name: device_name.trim().to_string(),
        }
    }

    /// Read a key file.
    ///
    /// The first `AGE-SECRET-KEY-` line is the identity; anything else apart
    /// from the device header is ignored.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| KeyError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut device_name = None;
        let mut secret = None;
        for line in text.lines().map(str::trim) {
            if let Some(name) = line.strip_prefix(DEVICE_HEADER) {
                device_name.get_or_insert_with(|| name.trim().to_string());
            } else if line.starts_with(SECRET_PREFIX) && secret.is_none() {
                secret = Some(line);
            }
        }

        let secret = secret.ok_or_else(|| KeyError::MissingSecret(path.to_path_buf()))?;
        let identity = secret
            .parse::<x25519::Identity>()
            .map_err(|reason| KeyError::Malformed {
                path: path.to_path_buf(),
                reason: reason.to_string(),
            })?;

        Ok(Self {
            identity,
            device_name: device_name.unwrap_or_default(),
        })
    }

    /// Write the key to `path` with owner-only permissions.
    ///
    /// An existing file is only replaced when `force` is set.
    pub fn write(&self, path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            return Err(KeyError::Exists(path.to_path_buf()));
        }
        if let Some(dir) = path.parent() {
            create_private_dir(dir).map_err(|source| KeyError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        write_private(path, self.render().as_bytes()).map_err(|source| KeyError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Device name from the key header; empty when the key has none.
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// The `age1...` public key.
    pub fn public_key(&self) -> String {
        self.identity.to_public().to_string()
    }

    /// The identity this key presents under `name`.
    ///
    /// An empty `name` falls back to the key's own device name, then to
    /// [`default_device_name`].
    pub fn device(&self, name: &str) -> DeviceIdentity {
        let name = [name.trim(), self.device_name.as_str()]
            .into_iter()
            .find(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(default_device_name);
        DeviceIdentity::from_public_key(name, self.public_key())
    }

    fn render(&self) -> String {
        let secret = self.identity.to_string();
        if self.device_name.is_empty() {
            format!("{}\n", secret.expose_secret())
        } else {
            format!(
                "{DEVICE_HEADER} {}\n{}\n",
                self.device_name,
                secret.expose_secret()
            )
        }
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}

fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
        options.mode(0o600);
        let mut file = options.open(path)?;
        // mode() only applies on creation
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
        file.write_all(contents)?;
        file.sync_all()
    }
    #[cfg(not(unix))]
    {
        let mut file = options.open(path)?;
        file.write_all(contents)?;
        file.sync_all()
    }
}
