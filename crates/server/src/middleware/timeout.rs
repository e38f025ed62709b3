use super::auth::vary_on_authorization;
use crate::errors::ApiError;
use axum::{
    error_handling::HandleErrorLayer,
    response::{IntoResponse, Response},
    BoxError, Router,
};
use std::time::Duration;
use tower::{
    timeout::{error::Elapsed, TimeoutLayer},
    ServiceBuilder,
};

/// Renders a failure from the timeout layer as a JSON error.
///
/// An elapsed deadline answers `408`; anything else the layer surfaces is a `500`. The
/// abandoned request never returned through the authentication gate, so `Vary` is stamped here.
pub async fn handle_timeout_error(err: BoxError) -> Response {
    let error = if err.is::<Elapsed>() {
        tracing::warn!("request exceeded its deadline");
        ApiError::RequestTimeout
    } else {
        ApiError::ServerError(format!("request middleware failed: {err}"))
    };

    let mut response = error.into_response();
    vary_on_authorization(&mut response);
    response
}

/// Bounds every request served by `router` to `timeout`.
pub fn with_request_timeout<S>(router: Router<S>, timeout: Duration) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_timeout_error))
            .layer(TimeoutLayer::new(timeout)),
    )
}
