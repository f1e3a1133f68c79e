//! CLI module for Chatgate
//!
//! - `serve`: run the HTTP gateway (default)
//! - `doctor`: configuration and connectivity diagnostics

use clap::{Parser, Subcommand};

pub mod doctor;

/// Chatgate quota-gated text generation gateway
#[derive(Parser, Debug)]
#[command(name = "chatgate")]
#[command(about = "Quota-gated text generation gateway")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the server (default)
    Serve,
    /// Check configuration, quota store, storage and providers
    Doctor,
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => crate::server::run().await,
        Commands::Doctor => doctor::run().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_is_default() {
        let cli = Cli::try_parse_from(["chatgate"]).unwrap();
        assert_eq!(cli.command, None);

        let cli = Cli::try_parse_from(["chatgate", "doctor"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Doctor));
    }

    #[test]
    fn test_unknown_subcommand_rejected() {
        assert!(Cli::try_parse_from(["chatgate", "init"]).is_err());
    }
}
