use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sentinel_core::{auth::repository::SqliteRepository, storage};
use std::sync::Arc;

mod commands;
use commands::{handle_tokens_command, handle_users_command, TokensCommands, UsersCommands};

#[derive(Parser)]
#[command(name = "sentinel-cli")]
#[command(about = "Sentinel CLI - Management tool for Sentinel users and tokens")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, env = "DATABASE_URL", default_value = "sqlite://db/sentinel.db")]
    database: String,
}

#[derive(Subcommand)]
enum Commands {
    /// User Management
    #[command(subcommand)]
    Users(UsersCommands),

    /// Token Management
    #[command(subcommand)]
    Tokens(TokensCommands),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let pool = storage::connect(&cli.database, 1)
        .await
        .with_context(|| format!("Failed to open database '{}'", cli.database))?;
    storage::init_schema(&pool).await.context("Failed to initialize schema")?;
    let repo = Arc::new(SqliteRepository::new(pool.clone()));

    let result = match cli.command {
        Commands::Users(users_command) => handle_users_command(users_command, repo).await,
        Commands::Tokens(tokens_command) => handle_tokens_command(tokens_command, repo).await,
    };

    pool.close().await;
    result
}
