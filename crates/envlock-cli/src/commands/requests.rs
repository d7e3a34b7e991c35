//! `envlock requests`

use anyhow::Result;
use clap::Subcommand;
use envlock::RequestId;

use super::{fmt_time, Context};

/// Enrollment request commands
#[derive(Subcommand)]
pub enum RequestCommands {
    /// List pending requests, newest first
    #[command(visible_alias = "list")]
    Ls {
        /// Include approved and rejected requests
        #[arg(long)]
        all: bool,
    },

    /// Approve a request and add its device as a recipient
    Approve {
        /// Request ID
        id: String,

        /// Note recorded on the request
        #[arg(long, default_value = "")]
        note: String,
    },

    /// Reject a request
    Reject {
        /// Request ID
        id: String,

        /// Reason recorded on the request
        #[arg(long, default_value = "")]
        reason: String,
    },
}

impl RequestCommands {
    pub async fn execute(self, ctx: &Context) -> Result<()> {
        let (_, envlock) = ctx.open_project()?;

        match self {
            RequestCommands::Ls { all } => {
                let requests = envlock.list_requests(all).await?;
                if requests.is_empty() {
                    if all {
                        println!("No enrollment requests");
                    } else {
                        println!("No pending enrollment requests");
                    }
                    return Ok(());
                }
                for request in requests {
                    println!("- {}", request.id);
                    println!("  status: {}", request.status);
                    println!("  device: {}", request.device_name);
                    println!("  fingerprint: {}", request.fingerprint);
                    println!("  invite_id: {}", request.invite_id);
                    println!("  created_at: {}", fmt_time(&request.created_at));
                    if let Some(at) = &request.decision_at {
                        println!("  decision_at: {}", fmt_time(at));
                    }
                    if !request.decision_note.is_empty() {
                        println!("  note: {}", request.decision_note);
                    }
                }
            }
            RequestCommands::Approve { id, note } => {
                let outcome = envlock.approve(&RequestId::new(&id), &note).await?;
                let request = &outcome.request;
                if outcome.recipient_added() {
                    println!(
                        "Approved request {} and added recipient: {} ({})",
                        request.id, request.device_name, request.fingerprint
                    );
                } else {
                    println!(
                        "Approved request {} (recipient already existed): {} ({})",
                        request.id, request.device_name, request.fingerprint
                    );
                }
            }
            RequestCommands::Reject { id, reason } => {
                let request = envlock.reject(&RequestId::new(&id), &reason).await?;
                println!(
                    "Rejected request {} for {} ({})",
                    request.id, request.device_name, request.fingerprint
                );
            }
        }
        Ok(())
    }
}
