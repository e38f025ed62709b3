use anyhow::{bail, Context, Result};
use chrono::Duration;
use clap::Subcommand;
use sentinel_core::auth::{
    repository::{SqliteRepository, UserRepository},
    store::TokenStore,
    token::TokenScope,
};
use std::sync::Arc;

/// Parses `activation` or `authentication` (case-insensitive).
pub fn parse_scope(raw: &str) -> Result<TokenScope, String> {
    TokenScope::from_str(raw)
        .ok_or_else(|| format!("unknown scope '{raw}', expected 'activation' or 'authentication'"))
}

#[derive(Subcommand)]
pub enum TokensCommands {
    /// Issue a token for an existing user
    Issue {
        #[arg(short, long)]
        user_id: i64,

        #[arg(short, long, value_parser = parse_scope, default_value = "authentication")]
        scope: TokenScope,

        #[arg(long, default_value = "24")]
        ttl_hours: i64,
    },

    /// Revoke every token a user holds in one scope
    Revoke {
        #[arg(short, long)]
        user_id: i64,

        #[arg(short, long, value_parser = parse_scope, default_value = "authentication")]
        scope: TokenScope,
    },
}

pub async fn handle_tokens_command(
    command: TokensCommands,
    repo: Arc<SqliteRepository>,
) -> Result<()> {
    match command {
        TokensCommands::Issue { user_id, scope, ttl_hours } => {
            if ttl_hours <= 0 {
                bail!("--ttl-hours must be positive");
            }

            let user = repo.get_user(user_id).await.context("Failed to look up user")?;
            let tokens = TokenStore::new(repo);
            let token = tokens
                .issue(user.id, Duration::hours(ttl_hours), scope)
                .await
                .context("Failed to issue token")?;

            println!("[SUCCESS] {scope} token issued for '{}'", user.email);
            println!("Token: {}", token.plaintext);
            println!("Expires: {}", token.expiry.format("%Y-%m-%d %H:%M UTC"));
            println!("[WARNING] Save this token securely - it cannot be retrieved later!");
        }

        TokensCommands::Revoke { user_id, scope } => {
            let tokens = TokenStore::new(repo);
            let removed =
                tokens.revoke_all(scope, user_id).await.context("Failed to revoke tokens")?;

            println!("[SUCCESS] Revoked {removed} {scope} token(s) for user {user_id}");
        }
    }

    Ok(())
}
