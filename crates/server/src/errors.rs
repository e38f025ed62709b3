use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use sentinel_core::{auth::AuthError, storage::StoreError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Every error a handler or middleware can answer with.
///
/// Rendered as `{"error": ...}` with the matching status code. Server-side detail is logged
/// and never sent to the client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("the requested resource could not be found")]
    NotFound,

    #[error("invalid or missing authentication token")]
    InvalidAuthenticationToken,

    #[error("you must be authenticated to access this resource")]
    AuthenticationRequired,

    #[error("your user account must be activated to access this resource")]
    InactiveAccount,

    #[error("unable to update the record due to an edit conflict, please try again")]
    EditConflict,

    #[error("invalid or expired activation token")]
    InvalidActivationToken,

    #[error("rate limit exceeded")]
    RateLimitExceeded,

    #[error("the request took too long to process")]
    RequestTimeout,

    #[error("the server encountered a problem and could not process your request")]
    ServerError(String),
}

impl ApiError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InvalidAuthenticationToken | Self::AuthenticationRequired => {
                StatusCode::UNAUTHORIZED
            }
            Self::InactiveAccount => StatusCode::FORBIDDEN,
            Self::EditConflict => StatusCode::CONFLICT,
            Self::InvalidActivationToken => StatusCode::UNPROCESSABLE_ENTITY,
            Self::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            Self::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            Self::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match &self {
            Self::InvalidActivationToken => json!({ "error": { "token": self.to_string() } }),
            Self::ServerError(detail) => {
                error!(error = %detail, "request failed with server error");
                json!({ "error": self.to_string() })
            }
            _ => json!({ "error": self.to_string() }),
        };

        let mut response = (status, Json(body)).into_response();

        if matches!(self, Self::InvalidAuthenticationToken) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }

        response
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RecordNotFound => Self::NotFound,
            StoreError::EditConflict => Self::EditConflict,
            StoreError::Duplicate(_) => {
                Self::BadRequest("a record with this value already exists".to_string())
            }
            StoreError::Timeout(_) | StoreError::Database(_) => Self::ServerError(err.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MalformedHeader | AuthError::InvalidToken => {
                Self::InvalidAuthenticationToken
            }
            AuthError::Storage(_) | AuthError::TokenGeneration(_) => {
                Self::ServerError(err.to_string())
            }
        }
    }
}
