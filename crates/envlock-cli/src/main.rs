//! envlock CLI
//!
//! Usage:
//!   envlock <subcommand> [options]
//!
//! Available subcommands:
//!   init        - Create the local device key
//!   status      - Show local key and project state
//!   project     - Initialize or show the project config
//!   invite      - Create, join, list and revoke invites
//!   requests    - List, approve and reject enrollment requests
//!   recipients  - List, add and remove recipients
//!
//! Logging goes to stderr and is filtered by `ENVLOCK_LOG` (default `warn`).

mod cli;
mod commands;
mod duration;
mod keys;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use commands::Context;

const LOG_ENV: &str = "ENVLOCK_LOG";

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            // --help and --version are not failures
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let ctx = Context::new(cli.project_dir, cli.key_name, cli.config_dir);

    match cli.command {
        Commands::Init(args) => args.execute(&ctx),
        Commands::Status => commands::status(&ctx).await,
        Commands::Project(cmd) => cmd.execute(&ctx).await,
        Commands::Invite(cmd) => cmd.execute(&ctx).await,
        Commands::Requests(cmd) => cmd.execute(&ctx).await,
        Commands::Recipients(cmd) => cmd.execute(&ctx).await,
    }
}
