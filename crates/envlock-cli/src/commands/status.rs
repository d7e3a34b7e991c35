//! `envlock status`

use std::fs;

use anyhow::Result;
use envlock::{EnvlockError, ProjectConfig};

use super::Context;
use crate::keys::DeviceKey;

/// Print local key and project state. Missing pieces are reported, not errors.
pub async fn status(ctx: &Context) -> Result<()> {
    let key_path = ctx.key_path()?;
    println!("Key path: {}", key_path.display());
    match fs::metadata(&key_path) {
        Ok(meta) => {
            println!("Local key: present ({} bytes)", meta.len());
            match DeviceKey::load(&key_path) {
                Ok(key) => {
                    let device = key.device("");
                    println!("Device: {}", device.name);
                    println!("Public key: {}", device.public_key);
                    println!("Fingerprint: {}", device.fingerprint);
                }
                Err(err) => println!("Key error: {err}"),
            }
        }
        Err(_) => println!("Local key: missing"),
    }

    let config = match ProjectConfig::load(ctx.project_dir()) {
        Ok(config) => config,
        Err(EnvlockError::ProjectNotFound(_)) => {
            println!("Project config: not found in {}", ctx.project_dir().display());
            return Ok(());
        }
        Err(err) => {
            println!("Project config: invalid ({err})");
            return Ok(());
        }
    };

    println!(
        "Project config: {}",
        ProjectConfig::path(ctx.project_dir()).display()
    );
    println!("App: {}", config.app_name);
    println!("Prefix: {}", config.effective_prefix());
    println!(
        "Backend: {} ({})",
        config.backend.kind(),
        config.backend.path().display()
    );

    let registry = match ctx.envlock_for(&config) {
        Ok(envlock) => envlock.recipients().await.map_err(anyhow::Error::from),
        Err(err) => Err(err),
    };
    match registry {
        Ok(registry) => println!(
            "Recipients: {} active / {} total",
            registry.active_count(),
            registry.len()
        ),
        Err(err) => println!("Recipients: unavailable ({err:#})"),
    }
    Ok(())
}
