//! Bearer token authentication for the Sentinel resource server.
//!
//! Credentials are opaque 26-character strings handed to a user exactly once. Only their
//! SHA-256 digest is persisted, together with the owning user, an expiry, and a scope that
//! limits what the credential may be used for.
//!
//! # Architecture
//!
//! - **[`token`]**: Credential codec ([`Token`](token::Token), [`TokenScope`](token::TokenScope))
//! - **[`repository`]**: Persistence traits ([`TokenRepository`](repository::TokenRepository),
//!   [`UserRepository`](repository::UserRepository)) and their `SQLite` implementation
//! - **[`store`]**: [`TokenStore`](store::TokenStore), the issue / resolve / revoke lifecycle
//! - **[`Identity`]**: Who the current request acts as
//!
//! # Resolution Flow
//!
//! ```text
//!   Authorization: Bearer ABCD...
//!        │
//!        ├──> Format check (26 chars) ──── fail ──> InvalidToken (no database call)
//!        │
//!        ├──> SHA-256 digest
//!        │
//!        ├──> tokens ⋈ users
//!        │    WHERE hash = ? AND scope = ? AND expiry > now
//!        │                                   │
//!        │          none ──> InvalidToken <──┤
//!        │                                   │
//!        └──> Identity::User(user) <─────────┘
//! ```
//!
//! Absent, expired, and revoked credentials all resolve to [`AuthError::InvalidToken`], so a
//! caller cannot learn which condition applied.
//!
//! # Error Handling
//!
//! - [`MalformedHeader`](AuthError::MalformedHeader): Header is not `Bearer <credential>`
//! - [`InvalidToken`](AuthError::InvalidToken): Credential failed the format check or lookup
//! - [`Storage`](AuthError::Storage): Backend failure or deadline, a server-side fault
//! - [`TokenGeneration`](AuthError::TokenGeneration): The system RNG failed

pub mod repository;
pub mod store;
pub mod token;

use crate::storage::StoreError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Error types for credential handling and authentication.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The `Authorization` header is not of the form `Bearer <credential>`
    #[error("malformed authorization header")]
    MalformedHeader,

    /// The credential is malformed, unknown, expired, or revoked
    #[error("invalid or expired authentication token")]
    InvalidToken,

    /// The token store could not be reached or did not answer in time
    #[error(transparent)]
    Storage(#[from] StoreError),

    /// Failed to generate cryptographically secure random bytes
    #[error("token generation error: {0}")]
    TokenGeneration(String),
}

impl AuthError {
    /// Whether the failure was caused by the caller rather than the server.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::MalformedHeader | Self::InvalidToken)
    }
}

/// A registered account that credentials resolve to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub email: String,
    pub activated: bool,
    #[serde(skip_serializing)]
    pub version: i32,
}

impl User {
    /// Builds an unsaved user. `id`, `created_at`, and `version` are assigned on insert.
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: 0,
            created_at: Utc::now(),
            name: name.into(),
            email: email.into(),
            activated: false,
            version: 1,
        }
    }
}

/// The caller a request acts on behalf of.
///
/// Attached to each request's extensions by the authentication layer and dropped with the
/// request. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// No `Authorization` header was presented
    Anonymous,
    /// A valid authentication credential resolved to this user
    User(User),
}

impl Identity {
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    #[must_use]
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Anonymous => None,
            Self::User(user) => Some(user),
        }
    }
}
