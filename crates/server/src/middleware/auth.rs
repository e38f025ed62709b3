use crate::errors::ApiError;
use axum::{
    body::Body,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sentinel_core::{
    auth::{AuthError, Identity, User},
    middleware::BearerAuth,
};
use std::sync::Arc;

/// Axum middleware that resolves the `Authorization` header to an [`Identity`].
///
/// On success the identity is inserted into request extensions for the guards below. Client
/// errors answer `401`; store failures answer `500`. Every response, including the handler's,
/// carries `Vary: Authorization`.
pub async fn authenticate_middleware(
    State(auth): State<Arc<BearerAuth>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .map(|value| value.to_str().map(ToOwned::to_owned));

    let result = match header {
        None => auth.authenticate(None).await,
        Some(Ok(value)) => auth.authenticate(Some(&value)).await,
        Some(Err(_)) => Err(AuthError::MalformedHeader),
    };

    let mut response = match result {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(e) => {
            if e.is_client_error() {
                tracing::debug!(error = %e, "authentication failed");
            }
            ApiError::from(e).into_response()
        }
    };

    vary_on_authorization(&mut response);
    response
}

/// Marks `response` as depending on the `Authorization` request header.
///
/// Responses built outside the gate (recovered panics, timeouts) go through this too, since
/// the gate never sees them return.
pub fn vary_on_authorization(response: &mut Response) {
    response.headers_mut().append(header::VARY, HeaderValue::from_static("Authorization"));
}

fn identity_from(parts: &Parts) -> Result<&Identity, ApiError> {
    parts
        .extensions
        .get::<Identity>()
        .ok_or_else(|| ApiError::ServerError("identity missing from request context".to_string()))
}

/// Guard for handlers that need a known caller.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match identity_from(parts)? {
            Identity::Anonymous => Err(ApiError::AuthenticationRequired),
            Identity::User(user) => Ok(Self(user.clone())),
        }
    }
}

/// Guard for handlers that need a caller whose account has been activated.
#[derive(Debug, Clone)]
pub struct ActivatedUser(pub User);

impl<S> FromRequestParts<S> for ActivatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(user) = AuthenticatedUser::from_request_parts(parts, state).await?;

        if !user.activated {
            return Err(ApiError::InactiveAccount);
        }

        Ok(Self(user))
    }
}
