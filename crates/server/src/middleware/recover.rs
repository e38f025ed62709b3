use super::auth::vary_on_authorization;
use crate::errors::ApiError;
use axum::{
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use std::any::Any;
use tower_http::catch_panic::CatchPanicLayer;

/// Turns a handler panic into a `500` that also closes the connection.
///
/// The panic payload is logged; the client gets the generic server error envelope. The
/// unwound future never reached the authentication gate's response path, so `Vary` is
/// stamped here.
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "unknown panic payload".to_string()
    };

    let mut response = ApiError::ServerError(format!("handler panicked: {detail}")).into_response();
    response.headers_mut().insert(header::CONNECTION, HeaderValue::from_static("close"));
    vary_on_authorization(&mut response);
    response
}

/// Outermost application boundary: catches panics from every layer inside it.
pub fn recover_layer() -> CatchPanicLayer<fn(Box<dyn Any + Send + 'static>) -> Response> {
    CatchPanicLayer::custom(handle_panic as fn(Box<dyn Any + Send + 'static>) -> Response)
}
