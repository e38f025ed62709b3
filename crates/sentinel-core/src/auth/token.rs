use crate::auth::AuthError;
use chrono::{DateTime, Duration, Utc};
use data_encoding::BASE32_NOPAD;
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Random bytes behind each credential.
pub const TOKEN_BYTES: usize = 16;

/// Length of the unpadded base-32 encoding of [`TOKEN_BYTES`].
pub const PLAINTEXT_LEN: usize = 26;

/// Intended use of a credential.
///
/// A credential resolves only under the scope it was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenScope {
    /// One-shot credential that confirms a new account
    Activation,
    /// Bearer credential accepted by the authentication layer
    Authentication,
}

impl TokenScope {
    /// Parse scope from string (for database storage and CLI input)
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "activation" => Some(Self::Activation),
            "authentication" => Some(Self::Authentication),
            _ => None,
        }
    }

    /// Convert to string for database storage
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Activation => "activation",
            Self::Authentication => "authentication",
        }
    }
}

impl fmt::Display for TokenScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An issued credential.
///
/// The plaintext is serialized as `token` so it can be handed to the user once. The digest,
/// owner, and scope never leave the server.
#[derive(Debug, Clone, Serialize)]
pub struct Token {
    #[serde(rename = "token")]
    pub plaintext: String,
    #[serde(skip)]
    pub hash: Vec<u8>,
    #[serde(skip)]
    pub user_id: i64,
    pub expiry: DateTime<Utc>,
    #[serde(skip)]
    pub scope: TokenScope,
}

impl Token {
    /// Generates a fresh credential for `user_id` that expires `ttl` from now.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenGeneration`] if the system random number generator fails.
    pub fn generate(user_id: i64, ttl: Duration, scope: TokenScope) -> Result<Self, AuthError> {
        let plaintext = generate_plaintext()?;
        let hash = hash_plaintext(&plaintext);

        Ok(Self { plaintext, hash, user_id, expiry: Utc::now() + ttl, scope })
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expiry
    }
}

/// Draws [`TOKEN_BYTES`] from the OS RNG and encodes them as base-32.
///
/// # Errors
///
/// Returns [`AuthError::TokenGeneration`] if the system random number generator fails.
pub fn generate_plaintext() -> Result<String, AuthError> {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; TOKEN_BYTES];
    rng.fill(&mut bytes).map_err(|_| {
        AuthError::TokenGeneration("failed to generate secure random bytes".to_string())
    })?;

    Ok(BASE32_NOPAD.encode(&bytes))
}

/// SHA-256 digest of the plaintext, the only form a credential is stored in.
#[must_use]
pub fn hash_plaintext(plaintext: &str) -> Vec<u8> {
    Sha256::digest(plaintext.as_bytes()).to_vec()
}

/// Cheap syntactic check run before any storage lookup.
#[must_use]
pub fn is_valid_plaintext(plaintext: &str) -> bool {
    !plaintext.is_empty() && plaintext.len() == PLAINTEXT_LEN
}
