//! Command-line structure.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::{
    InitArgs, InviteCommands, ProjectCommands, RecipientCommands, RequestCommands,
};
use crate::keys::DEFAULT_KEY_NAME;

/// envlock - share encrypted .env files between trusted machines
///
/// Manages the local device key, the project's recipient registry and the
/// invite / join / approve flow that enrolls new machines.
#[derive(Parser)]
#[command(name = "envlock")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log debug output to stderr (overrides ENVLOCK_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project directory
    #[arg(short = 'C', long, global = true, default_value = ".")]
    pub project_dir: PathBuf,

    /// Name of the local key to use
    #[arg(long, global = true, default_value = DEFAULT_KEY_NAME)]
    pub key_name: String,

    /// Directory holding local keys (defaults to the user config directory)
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the local device key
    Init(InitArgs),

    /// Show local key and project state
    Status,

    /// Project configuration
    #[command(subcommand)]
    Project(ProjectCommands),

    /// Create, use and revoke invites
    #[command(subcommand)]
    Invite(InviteCommands),

    /// Review enrollment requests
    #[command(subcommand)]
    Requests(RequestCommands),

    /// Manage the recipient registry
    #[command(subcommand, visible_alias = "devices")]
    Recipients(RecipientCommands),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "envlock", "requests", "ls", "--all", "-C", "/tmp/p", "--key-name", "work", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.project_dir, PathBuf::from("/tmp/p"));
        assert_eq!(cli.key_name, "work");
        assert!(matches!(
            cli.command,
            Commands::Requests(RequestCommands::Ls { all: true })
        ));
    }

    #[test]
    fn test_invite_ttl_is_validated_at_parse_time() {
        assert!(Cli::try_parse_from(["envlock", "invite", "create", "--ttl", "1h30m"]).is_ok());
        assert!(Cli::try_parse_from(["envlock", "invite", "create", "--ttl", "0s"]).is_err());
        assert!(Cli::try_parse_from(["envlock", "invite", "create", "--ttl", "soon"]).is_err());
    }

    #[test]
    fn test_devices_alias() {
        let cli = Cli::try_parse_from(["envlock", "devices", "ls"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Recipients(RecipientCommands::List { all: false })
        ));
    }
}
