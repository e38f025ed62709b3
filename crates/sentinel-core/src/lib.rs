//! # Sentinel Core
//!
//! Business logic for the Sentinel resource server. Nothing in this crate knows about HTTP;
//! the `server` crate adapts these types to axum.
//!
//! - **[`middleware`]**: Per-client token bucket admission and bearer-token authentication.
//!
//! - **[`auth`]**: Credential codec, scoped token store, and the user/token repositories.
//!
//! - **[`movies`]**: The versioned `movies` resource and its optimistic-concurrency repository.
//!
//! - **[`storage`]**: `SQLite` pool setup, schema bootstrap, and per-query deadlines.
//!
//! - **[`config`]**: Layered configuration (defaults, TOML file, environment).
//!
//! ## Request Flow
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌──────────────┐
//! │ RateLimiter  │ ─── Denied ──► 429
//! └──────┬───────┘
//!        │ Admitted
//!        ▼
//! ┌──────────────┐
//! │  BearerAuth  │ ─── Invalid ──► 401    Store failure ──► 500
//! └──────┬───────┘
//!        │ Identity (Anonymous | User)
//!        ▼
//! ┌──────────────┐
//! │   Handler    │ ─── Stale version ──► 409
//! └──────┬───────┘
//!        │
//!        ▼
//!   Response to Client
//! ```

pub mod auth;
pub mod config;
pub mod middleware;
pub mod movies;
pub mod storage;
