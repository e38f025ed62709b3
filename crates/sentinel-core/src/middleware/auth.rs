use crate::auth::{
    store::TokenStore,
    token::{is_valid_plaintext, TokenScope},
    AuthError, Identity,
};
use std::sync::Arc;

/// Resolves the `Authorization` header of a request to an [`Identity`].
pub struct BearerAuth {
    tokens: Arc<TokenStore>,
}

impl BearerAuth {
    pub fn new(tokens: Arc<TokenStore>) -> Self {
        Self { tokens }
    }

    /// Runs the header through format checks and, if they pass, one store lookup.
    ///
    /// A missing or empty header is not an error: the caller proceeds as
    /// [`Identity::Anonymous`].
    ///
    /// # Errors
    ///
    /// - [`AuthError::MalformedHeader`] when the header is not exactly `Bearer <credential>`
    /// - [`AuthError::InvalidToken`] when the credential is malformed or does not resolve
    /// - [`AuthError::Storage`] when the lookup fails or times out
    pub async fn authenticate(&self, authorization: Option<&str>) -> Result<Identity, AuthError> {
        let header = match authorization {
            None | Some("") => return Ok(Identity::Anonymous),
            Some(header) => header,
        };

        let credential = bearer_credential(header).ok_or(AuthError::MalformedHeader)?;

        if !is_valid_plaintext(credential) {
            return Err(AuthError::InvalidToken);
        }

        let user = self.tokens.resolve(TokenScope::Authentication, credential).await?;
        Ok(Identity::User(user))
    }
}

/// Splits `Bearer <credential>` on single spaces; anything but exactly two parts is malformed.
fn bearer_credential(header: &str) -> Option<&str> {
    let mut parts = header.split(' ');

    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(credential), None) => Some(credential),
        _ => None,
    }
}
