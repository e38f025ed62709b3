use anyhow::{bail, Context, Result};
use chrono::Duration;
use clap::Subcommand;
use sentinel_core::auth::{
    repository::{SqliteRepository, UserRepository},
    store::TokenStore,
    token::{is_valid_plaintext, Token, TokenScope},
    AuthError, User,
};
use std::sync::Arc;

/// Lifetime of the activation token handed out on account creation.
const ACTIVATION_TTL_DAYS: i64 = 3;

#[derive(Subcommand)]
pub enum UsersCommands {
    /// Register a user and print a one-time activation token
    Create {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,
    },

    /// Activate the user owning an activation token
    Activate {
        #[arg(short, long)]
        token: String,
    },
}

pub async fn handle_users_command(
    command: UsersCommands,
    repo: Arc<SqliteRepository>,
) -> Result<()> {
    match command {
        UsersCommands::Create { name, email } => {
            let (user, token) = create_user(repo, &name, &email).await?;

            println!("[SUCCESS] User created successfully!");
            println!("ID: {}", user.id);
            println!("Email: {}", user.email);
            println!("Activation token: {}", token.plaintext);
            println!("Expires: {}", token.expiry.format("%Y-%m-%d %H:%M UTC"));
            println!("[WARNING] Save this token securely - it cannot be retrieved later!");
        }

        UsersCommands::Activate { token } => {
            let user = activate_user(repo, &token).await?;
            println!("[SUCCESS] User '{}' (ID {}) has been activated", user.email, user.id);
        }
    }

    Ok(())
}

/// Inserts a new, inactive user and issues its activation token.
pub async fn create_user(
    repo: Arc<SqliteRepository>,
    name: &str,
    email: &str,
) -> Result<(User, Token)> {
    let mut user = User::new(name, email);
    repo.create_user(&mut user).await.context("Failed to create user")?;

    let tokens = TokenStore::new(repo);
    let token = tokens
        .issue(user.id, Duration::days(ACTIVATION_TTL_DAYS), TokenScope::Activation)
        .await
        .context("Failed to issue activation token")?;

    Ok((user, token))
}

/// Activates the owner of `plaintext` and revokes all of their activation tokens.
pub async fn activate_user(repo: Arc<SqliteRepository>, plaintext: &str) -> Result<User> {
    if !is_valid_plaintext(plaintext) {
        bail!("Activation token must be 26 characters long");
    }

    let tokens = TokenStore::new(repo.clone());
    let mut user = match tokens.resolve(TokenScope::Activation, plaintext).await {
        Ok(user) => user,
        Err(AuthError::InvalidToken) => bail!("Invalid or expired activation token"),
        Err(e) => return Err(e).context("Failed to look up activation token"),
    };

    repo.activate_user(&mut user).await.context("Failed to activate user")?;
    tokens
        .revoke_all(TokenScope::Activation, user.id)
        .await
        .context("Failed to revoke activation tokens")?;

    Ok(user)
}
