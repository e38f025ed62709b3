//! Admission control and authentication for incoming requests.
//!
//! This module provides the **business logic layer** for request processing middleware.
//! HTTP adapter functions (Axum layers and extractors) live in `crates/server/src/middleware`,
//! while this module decides admit/deny and resolves identities without any HTTP types.
//!
//! # Architecture
//!
//! ```text
//!   Incoming Request
//!        │
//!        ▼
//!   ┌─────────────────────────┐
//!   │  1. RATE LIMITING       │  RateLimiter::admit()
//!   │     - Bucket per IP     │  - Refill, then consume one token
//!   │     - Idle sweep        │  - Evict after 3 minutes idle
//!   └─────────────────────────┘
//!        │ denied?
//!        ├─> 429 Too Many Requests
//!        │
//!        ▼
//!   ┌─────────────────────────┐
//!   │  2. AUTHENTICATION      │  BearerAuth::authenticate()
//!   │     - Authorization     │  - Format check before lookup
//!   │     - Token store       │  - Scoped, unexpired digests only
//!   └─────────────────────────┘
//!        │ AuthError?
//!        ├─> 401 (client error) or 500 (store failure)
//!        │
//!        ▼
//!   Handler, with Identity attached to the request
//! ```
//!
//! # Module Organization
//!
//! - **[`rate_limiting`]**: Token bucket rate limiter keyed by client IP
//! - **[`auth`]**: `Authorization: Bearer` resolution to an [`Identity`](crate::auth::Identity)

pub mod auth;
pub mod rate_limiting;

pub use auth::BearerAuth;
pub use rate_limiting::RateLimiter;
