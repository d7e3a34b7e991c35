//! `envlock invite`

use anyhow::{bail, Result};
use chrono::{Duration, Utc};
use clap::{Args, Subcommand};
use envlock::InviteId;
use tracing::debug;

use super::{fmt_time, non_empty, Context};
use crate::duration::parse_ttl;

/// Invite commands
#[derive(Subcommand)]
pub enum InviteCommands {
    /// Issue a single-use invite token
    Create {
        /// How long the invite stays valid (e.g. 15m, 1h30m)
        #[arg(long, value_parser = parse_ttl)]
        ttl: Option<Duration>,
    },

    /// Request enrollment of this device with an invite token
    Join(JoinArgs),

    /// List invites, newest first
    #[command(visible_alias = "list")]
    Ls,

    /// Revoke an unused invite
    Revoke {
        /// Invite ID
        id: String,
    },
}

/// Arguments for joining a project
#[derive(Args)]
pub struct JoinArgs {
    /// Invite token, or a URL carrying it as ?token=
    pub token_or_url: Option<String>,

    /// Invite token (alternative to the positional argument)
    #[arg(long = "token")]
    pub token: Option<String>,

    /// Device name (defaults to the key's name, then the hostname)
    #[arg(long)]
    pub name: Option<String>,
}

impl InviteCommands {
    pub async fn execute(self, ctx: &Context) -> Result<()> {
        match self {
            InviteCommands::Create { ttl } => create(ctx, ttl).await,
            InviteCommands::Join(args) => join(ctx, args).await,
            InviteCommands::Ls => list(ctx).await,
            InviteCommands::Revoke { id } => revoke(ctx, &id).await,
        }
    }
}

async fn create(ctx: &Context, ttl: Option<Duration>) -> Result<()> {
    let (_, envlock) = ctx.open_project()?;

    let created_by = match ctx.load_key() {
        Ok(key) => key.device_name().to_string(),
        Err(err) => {
            debug!(error = %err, "no local key; invite has no creator");
            String::new()
        }
    };

    let (invite, token) = envlock.create_invite(&created_by, ttl).await?;

    println!("Created invite: {}", invite.id);
    println!("Expires at: {}", fmt_time(&invite.expires_at));
    println!("Invite token (share with new machine): {token}");
    Ok(())
}

async fn join(ctx: &Context, args: JoinArgs) -> Result<()> {
    let Some(token) = non_empty(args.token_or_url).or_else(|| non_empty(args.token)) else {
        bail!("invite token is required (pass <token-or-url> or --token)");
    };

    let key = ctx.load_key()?;
    let (_, envlock) = ctx.open_project()?;

    let device = key.device(args.name.as_deref().unwrap_or_default());
    let request = envlock.join(&token, &device).await?;

    println!("Created enrollment request: {}", request.id);
    println!("Device: {} ({})", request.device_name, request.fingerprint);
    println!(
        "Ask a trusted machine to run: envlock requests approve {}",
        request.id
    );
    Ok(())
}

async fn list(ctx: &Context) -> Result<()> {
    let (_, envlock) = ctx.open_project()?;
    let invites = envlock.list_invites().await?;
    if invites.is_empty() {
        println!("No invites");
        return Ok(());
    }

    let now = Utc::now();
    for invite in invites {
        println!("- {}", invite.id);
        if invite.status.is_usable() && invite.is_expired(now) {
            println!("  status: {} (expired)", invite.status);
        } else {
            println!("  status: {}", invite.status);
        }
        if !invite.created_by.is_empty() {
            println!("  created_by: {}", invite.created_by);
        }
        println!("  created_at: {}", fmt_time(&invite.created_at));
        println!("  expires_at: {}", fmt_time(&invite.expires_at));
        if let Some(request_id) = &invite.used_by_request_id {
            println!("  used_by_request: {request_id}");
        }
        if let Some(used_at) = &invite.used_at {
            println!("  used_at: {}", fmt_time(used_at));
        }
    }
    Ok(())
}

async fn revoke(ctx: &Context, id: &str) -> Result<()> {
    let (_, envlock) = ctx.open_project()?;
    let invite = envlock.revoke_invite(&InviteId::new(id)).await?;
    println!("Revoked invite {}", invite.id);
    Ok(())
}
