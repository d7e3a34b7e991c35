//! `envlock init`

use anyhow::Result;
use clap::Args;

use super::{non_empty, Context};
use crate::keys::{self, DeviceKey};

/// Arguments for creating the local device key
#[derive(Args)]
pub struct InitArgs {
    /// Device name (defaults to the hostname)
    #[arg(long)]
    pub name: Option<String>,

    /// Replace an existing key
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn execute(self, ctx: &Context) -> Result<()> {
        let path = ctx.key_path()?;
        let name = non_empty(self.name).unwrap_or_else(keys::default_device_name);

        let key = DeviceKey::generate(&name);
        key.write(&path, self.force)?;
        let device = key.device(&name);

        println!("Created local device key: {}", path.display());
        println!("Device name: {}", device.name);
        println!("Public key: {}", device.public_key);
        println!("Fingerprint: {}", device.fingerprint);
        Ok(())
    }
}
