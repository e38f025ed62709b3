use super::{
    repository::TokenRepository,
    token::{hash_plaintext, is_valid_plaintext, Token, TokenScope},
    AuthError, User,
};
use chrono::Duration;
use std::sync::Arc;
use tracing::debug;

/// Issues, resolves, and revokes scoped credentials.
///
/// Plaintext leaves this type exactly once, inside the [`Token`] returned by
/// [`issue`](Self::issue). Everything after that works on digests.
pub struct TokenStore {
    repository: Arc<dyn TokenRepository>,
}

impl TokenStore {
    pub fn new(repository: Arc<dyn TokenRepository>) -> Self {
        Self { repository }
    }

    /// Generates a credential for `user_id`, persists its digest, and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenGeneration`] if the RNG fails, or [`AuthError::Storage`] if the
    /// insert fails or exceeds its deadline.
    pub async fn issue(
        &self,
        user_id: i64,
        ttl: Duration,
        scope: TokenScope,
    ) -> Result<Token, AuthError> {
        let token = Token::generate(user_id, ttl, scope)?;
        self.repository.insert(&token).await?;

        debug!(user_id, scope = %scope, expiry = %token.expiry, "issued token");
        Ok(token)
    }

    /// Resolves a plaintext credential to its owner.
    ///
    /// Malformed plaintext is rejected without touching storage.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] when the credential is malformed, unknown, expired,
    /// revoked, or issued under another scope. Returns [`AuthError::Storage`] on backend failure.
    pub async fn resolve(&self, scope: TokenScope, plaintext: &str) -> Result<User, AuthError> {
        if !is_valid_plaintext(plaintext) {
            return Err(AuthError::InvalidToken);
        }

        let hash = hash_plaintext(plaintext);
        self.repository.find_user_for_token(scope, &hash).await?.ok_or(AuthError::InvalidToken)
    }

    /// Deletes every credential `user_id` holds in `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`] if the delete fails or exceeds its deadline.
    pub async fn revoke_all(&self, scope: TokenScope, user_id: i64) -> Result<u64, AuthError> {
        let removed = self.repository.delete_all_for_user(scope, user_id).await?;

        debug!(user_id, scope = %scope, removed, "revoked tokens");
        Ok(removed)
    }
}
