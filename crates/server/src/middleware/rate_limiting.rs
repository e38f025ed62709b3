use crate::errors::ApiError;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use sentinel_core::middleware::RateLimiter;
use std::{net::SocketAddr, sync::Arc};

/// Rate limiting middleware that enforces per-IP request limits.
///
/// The peer address comes from `ConnectInfo`, which the server installs through
/// `into_make_service_with_connect_info`.
///
/// # Errors
///
/// Returns [`ApiError::RateLimitExceeded`] when the client's bucket is empty, or
/// [`ApiError::ServerError`] when the peer address is not available.
pub async fn rate_limit_middleware(
    State(rate_limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if !rate_limiter.is_enabled() {
        return Ok(next.run(request).await);
    }

    let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>().copied()
    else {
        return Err(ApiError::ServerError("peer address missing from request".to_string()));
    };

    if !rate_limiter.admit(addr.ip()) {
        tracing::debug!(client = %addr.ip(), "rate limit exceeded");
        return Err(ApiError::RateLimitExceeded);
    }

    Ok(next.run(request).await)
}
