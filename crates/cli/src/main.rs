//! Sneakersku CLI - Database migrations and API token management.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! sk-cli migrate
//!
//! # Issue an API token for a user
//! sk-cli token issue -u user-123 -r user
//!
//! # Delete expired tokens
//! sk-cli token purge
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "sk-cli")]
#[command(author, version, about = "Sneakersku CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage API tokens
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Issue a bearer token for a user
    Issue {
        /// User ID the token authenticates as
        #[arg(short, long)]
        user: String,

        /// Role (`user` or `admin`)
        #[arg(short, long, default_value = "user")]
        role: String,

        /// Lifetime in seconds (default: `AUTH_TOKEN_TTL_SECS` or 3600)
        #[arg(short, long)]
        ttl_secs: Option<u64>,
    },
    /// Delete expired tokens
    Purge,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Token { action } => match action {
            TokenAction::Issue {
                user,
                role,
                ttl_secs,
            } => commands::token::issue(&user, &role, ttl_secs).await?,
            TokenAction::Purge => {
                commands::token::purge().await?;
            }
        },
    }
    Ok(())
}
