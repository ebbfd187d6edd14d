//! Zebrands CLI - database migrations and account management.
//!
//! # Usage
//!
//! ```bash
//! # Apply catalog database migrations
//! zb-cli migrate
//!
//! # Make sure the ProductAdmin and UserAdmin groups exist
//! zb-cli groups sync
//!
//! # Bootstrap the first administrator (both roles by default)
//! zb-cli user create -u root -e root@example.com -p 's3cret'
//!
//! # Create a catalog-only administrator
//! zb-cli user create -u catalog -e catalog@example.com -p 's3cret' -r product_admin
//! ```
//!
//! All commands read `DATABASE_URL` from the environment (or `.env`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use zebrands_core::Role;

mod commands;

#[derive(Parser)]
#[command(name = "zb-cli")]
#[command(author, version, about = "Zebrands catalog CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage authorization groups
    Groups {
        #[command(subcommand)]
        action: GroupsAction,
    },
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum GroupsAction {
    /// Create any missing authorization group
    Sync,
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a user account
    Create {
        /// Login name (letters, digits and @.+-_)
        #[arg(short, long)]
        username: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password
        #[arg(short, long)]
        password: String,

        #[arg(long, default_value = "")]
        first_name: String,

        #[arg(long, default_value = "")]
        last_name: String,

        /// Role to grant (`product_admin`, `user_admin`); repeatable.
        /// Defaults to both.
        #[arg(short, long = "role")]
        roles: Vec<Role>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Groups { action } => match action {
            GroupsAction::Sync => commands::groups::sync().await?,
        },
        Commands::User { action } => match action {
            UserAction::Create {
                username,
                email,
                password,
                first_name,
                last_name,
                roles,
            } => {
                let account = commands::user::NewAccount {
                    username,
                    email,
                    password,
                    first_name,
                    last_name,
                };
                commands::user::create(&account, &roles).await?;
            }
        },
    }
    Ok(())
}
