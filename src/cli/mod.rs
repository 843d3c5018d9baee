//! Command-line interface for Eventaic.

use clap::{Parser, Subcommand};

/// Eventaic - AI ad-copy generation backend
#[derive(Parser)]
#[command(name = "eventaic")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API (default)
    #[command(alias = "daemon")]
    Serve,

    /// Write a default config.toml if none exists
    Init,

    /// Create a super admin account
    CreateAdmin {
        #[arg(long)]
        email: String,

        #[arg(long)]
        username: String,

        /// Read from EVENTAIC_ADMIN_PASSWORD when omitted
        #[arg(long, env = "EVENTAIC_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Zero every company's monthly generation counter
    ResetUsage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_create_admin() {
        let cli = Cli::parse_from([
            "eventaic",
            "create-admin",
            "--email",
            "root@example.com",
            "--username",
            "root",
            "--password",
            "S3cret!pass",
        ]);
        match cli.command {
            Some(Commands::CreateAdmin { email, username, .. }) => {
                assert_eq!(email, "root@example.com");
                assert_eq!(username, "root");
            }
            _ => panic!("expected create-admin"),
        }
    }

    #[test]
    fn test_no_subcommand_is_allowed() {
        let cli = Cli::parse_from(["eventaic"]);
        assert!(cli.command.is_none());
    }
}
