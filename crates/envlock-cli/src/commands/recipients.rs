//! `envlock recipients`

use anyhow::Result;
use clap::Subcommand;
use envlock::NewRecipient;

use super::{fmt_time, Context};
use crate::keys::validate_recipient;

/// Recipient registry commands
#[derive(Subcommand)]
pub enum RecipientCommands {
    /// List recipients by name
    #[command(visible_alias = "ls")]
    List {
        /// Include revoked recipients
        #[arg(long)]
        all: bool,
    },

    /// Add a recipient by public key
    Add {
        /// Recipient name
        name: String,

        /// age public key (age1...)
        public_key: String,

        /// Free-form note
        #[arg(long, default_value = "")]
        note: String,
    },

    /// Revoke a recipient, or delete it with --hard
    #[command(visible_aliases = ["revoke", "rm"])]
    Remove {
        /// Recipient name or fingerprint
        query: String,

        /// Delete the entry instead of marking it revoked
        #[arg(long)]
        hard: bool,
    },
}

impl RecipientCommands {
    pub async fn execute(self, ctx: &Context) -> Result<()> {
        match self {
            RecipientCommands::List { all } => {
                let (_, envlock) = ctx.open_project()?;
                let recipients = envlock.list_recipients(all).await?;
                if recipients.is_empty() {
                    println!("No recipients");
                    return Ok(());
                }
                for recipient in recipients {
                    println!("- {}", recipient.name);
                    println!("  status: {}", recipient.status);
                    println!("  fingerprint: {}", recipient.fingerprint);
                    if !recipient.source.is_empty() {
                        println!("  source: {}", recipient.source);
                    }
                    println!("  created_at: {}", fmt_time(&recipient.created_at));
                    if !recipient.note.is_empty() {
                        println!("  note: {}", recipient.note);
                    }
                }
            }
            RecipientCommands::Add {
                name,
                public_key,
                note,
            } => {
                let public_key = validate_recipient(&public_key)?;
                let (_, envlock) = ctx.open_project()?;
                let fingerprint = envlock::core::fingerprint(&public_key);
                let added = envlock
                    .add_recipient(NewRecipient::new(name, public_key, fingerprint).note(note))
                    .await?;
                println!("Added recipient {:?} ({})", added.name, added.fingerprint);
            }
            RecipientCommands::Remove { query, hard } => {
                let (_, envlock) = ctx.open_project()?;
                if hard {
                    let removed = envlock.delete_recipient(&query).await?;
                    println!("Deleted recipient {:?} ({})", removed.name, removed.fingerprint);
                } else {
                    let revoked = envlock.revoke_recipient(&query).await?;
                    println!("Revoked recipient {:?} ({})", revoked.name, revoked.fingerprint);
                    println!("Note: existing encrypted blobs remain decryptable until rekeyed.");
                }
            }
        }
        Ok(())
    }
}
