use crate::{
    app::AppState,
    errors::ApiError,
    middleware::{ActivatedUser, AuthenticatedUser},
};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sentinel_core::{
    auth::{token::TokenScope, AuthError},
    movies::{Movie, Runtime},
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

/// Optional header carrying the version the client last read.
pub const EXPECTED_VERSION_HEADER: &str = "x-expected-version";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateMovieRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub year: i32,
    #[serde(default)]
    pub runtime: Runtime,
    #[serde(default)]
    pub genres: Vec<String>,
}

/// Partial update: absent fields keep their stored value.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateMovieRequest {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub runtime: Option<Runtime>,
    pub genres: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActivateUserRequest {
    pub token: String,
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

fn path_id(id: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    match id {
        Ok(Path(id)) if id >= 1 => Ok(id),
        _ => Err(ApiError::NotFound),
    }
}

/// GET /v1/healthcheck
pub async fn handle_healthcheck(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "available",
        "environment": state.environment,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// POST /v1/movies
pub async fn handle_create_movie(
    ActivatedUser(user): ActivatedUser,
    State(state): State<AppState>,
    payload: Result<Json<CreateMovieRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let input = json_body(payload)?;

    let mut movie = Movie::new(input.title, input.year, input.runtime, input.genres);
    state.movies.insert(&mut movie).await?;
    info!(movie_id = movie.id, user_id = user.id, "movie created");

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/v1/movies/{}", movie.id))],
        Json(json!({ "movie": movie })),
    ))
}

/// GET /v1/movies/{id}
pub async fn handle_show_movie(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let movie = state.movies.get(path_id(id)?).await?;

    Ok(Json(json!({ "movie": movie })))
}

/// PATCH /v1/movies/{id}
///
/// Applies the supplied fields on top of the stored record and writes it back only if
/// nobody else wrote in between.
pub async fn handle_update_movie(
    ActivatedUser(user): ActivatedUser,
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    headers: HeaderMap,
    payload: Result<Json<UpdateMovieRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let mut movie = state.movies.get(path_id(id)?).await?;

    if let Some(expected) = headers.get(EXPECTED_VERSION_HEADER) {
        if expected.to_str().ok() != Some(movie.version.to_string().as_str()) {
            return Err(ApiError::EditConflict);
        }
    }

    let input = json_body(payload)?;

    if let Some(title) = input.title {
        movie.title = title;
    }
    if let Some(year) = input.year {
        movie.year = year;
    }
    if let Some(runtime) = input.runtime {
        movie.runtime = runtime;
    }
    if let Some(genres) = input.genres {
        movie.genres = genres;
    }

    let version = state.movies.update(&mut movie).await?;
    info!(movie_id = movie.id, version, user_id = user.id, "movie updated");

    Ok(Json(json!({ "movie": movie })))
}

/// DELETE /v1/movies/{id}
pub async fn handle_delete_movie(
    ActivatedUser(user): ActivatedUser,
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let id = path_id(id)?;
    state.movies.delete(id).await?;
    info!(movie_id = id, user_id = user.id, "movie deleted");

    Ok(Json(json!({ "message": "movie successfully deleted" })))
}

/// PUT /v1/users/activated
///
/// Consumes an activation token: the owner is activated and every activation token they
/// hold is revoked. Malformed tokens are rejected before any lookup.
pub async fn handle_activate_user(
    State(state): State<AppState>,
    payload: Result<Json<ActivateUserRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let input = json_body(payload)?;

    let mut user =
        state.tokens.resolve(TokenScope::Activation, &input.token).await.map_err(|e| match e {
            AuthError::MalformedHeader | AuthError::InvalidToken => {
                ApiError::InvalidActivationToken
            }
            other => ApiError::from(other),
        })?;

    state.users.activate_user(&mut user).await?;
    state.tokens.revoke_all(TokenScope::Activation, user.id).await?;
    info!(user_id = user.id, "user activated");

    Ok(Json(json!({ "user": user })))
}

/// DELETE /v1/tokens/authentication
///
/// Revokes every authentication token of the caller, including the one used for this request.
pub async fn handle_revoke_authentication_tokens(
    AuthenticatedUser(user): AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    let revoked = state.tokens.revoke_all(TokenScope::Authentication, user.id).await?;
    info!(user_id = user.id, revoked, "authentication tokens revoked");

    Ok(Json(json!({ "message": "authentication tokens successfully revoked" })))
}

/// Fallback for unmatched routes.
pub async fn handle_not_found() -> ApiError {
    ApiError::NotFound
}
