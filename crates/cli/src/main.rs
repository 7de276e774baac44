//! Fastprint CLI - Database migrations and staff management.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending schema migrations
//! fastprint-cli migrate
//!
//! # Give a profile access to the order administration endpoints
//! fastprint-cli staff grant -e staff@example.com
//!
//! # Take it away again
//! fastprint-cli staff revoke -e staff@example.com
//! ```
//!
//! Both commands read `FASTPRINT_DATABASE_URL` (or `DATABASE_URL`), loading
//! a `.env` file first when one exists.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "fastprint-cli")]
#[command(author, version, about = "Fastprint operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage staff accounts
    Staff {
        #[command(subcommand)]
        action: StaffAction,
    },
}

#[derive(Subcommand)]
enum StaffAction {
    /// Mark a profile as staff
    Grant {
        /// Email of an existing profile
        #[arg(short, long)]
        email: String,
    },
    /// Remove the staff flag from a profile
    Revoke {
        /// Email of an existing profile
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await,
        Commands::Staff { action } => match action {
            StaffAction::Grant { email } => commands::staff::set(&email, true).await,
            StaffAction::Revoke { email } => commands::staff::set(&email, false).await,
        },
    }
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
    fn test_parses_staff_grant() {
        let cli = Cli::try_parse_from(["fastprint-cli", "staff", "grant", "-e", "a@b.co"])
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(
            cli.command,
            Commands::Staff {
                action: StaffAction::Grant { ref email }
            } if email == "a@b.co"
        ));
    }

    #[test]
    fn test_staff_requires_email() {
        assert!(Cli::try_parse_from(["fastprint-cli", "staff", "revoke"]).is_err());
    }
}
