//! HTTP middleware components for the Sentinel server.
//!
//! This module contains Axum middleware adapters that wrap the business logic
//! components from `sentinel_core::middleware`. The middleware functions here handle
//! HTTP-specific concerns (request/response manipulation, status codes) while
//! delegating business logic to the core library.

pub mod auth;
pub mod rate_limiting;
pub mod recover;
pub mod request_id;
pub mod timeout;

pub use auth::{
    authenticate_middleware, vary_on_authorization, ActivatedUser, AuthenticatedUser,
};
pub use rate_limiting::rate_limit_middleware;
pub use recover::{handle_panic, recover_layer};
pub use request_id::{
    create_request_id_layers, make_request_span, UuidRequestIdGenerator, X_REQUEST_ID,
};
pub use timeout::{handle_timeout_error, with_request_timeout};
