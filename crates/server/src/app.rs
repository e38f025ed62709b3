use crate::{middleware, router};
use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use sentinel_core::{
    auth::{
        repository::{SqliteRepository, UserRepository},
        store::TokenStore,
    },
    middleware::{BearerAuth, RateLimiter},
    movies::repository::{MovieRepository, SqliteMovieRepository},
};
use sqlx::SqlitePool;
use std::{sync::Arc, time::Duration};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared handles available to every route handler.
#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<TokenStore>,
    pub users: Arc<dyn UserRepository>,
    pub movies: Arc<dyn MovieRepository>,
    pub environment: String,
}

impl AppState {
    /// Wires the `SQLite` repositories over one pool, each bounded by `query_timeout`.
    #[must_use]
    pub fn from_pool(pool: SqlitePool, query_timeout: Duration, environment: &str) -> Self {
        let users =
            Arc::new(SqliteRepository::new(pool.clone()).with_query_timeout(query_timeout));
        let movies = Arc::new(SqliteMovieRepository::new(pool).with_query_timeout(query_timeout));

        Self {
            tokens: Arc::new(TokenStore::new(users.clone())),
            users,
            movies,
            environment: environment.to_string(),
        }
    }
}

/// Builds the full application.
///
/// Layers, outermost first: request ID and trace span, request timeout, panic recovery,
/// rate limiting, authentication, then the routes.
pub fn create_app(
    state: AppState,
    rate_limiter: Arc<RateLimiter>,
    request_timeout: Duration,
) -> Router {
    let auth = Arc::new(BearerAuth::new(state.tokens.clone()));
    let (set_request_id, propagate_request_id) = middleware::create_request_id_layers();

    let routes = Router::new()
        .route("/v1/healthcheck", get(router::handle_healthcheck))
        .route("/v1/movies", post(router::handle_create_movie))
        .route(
            "/v1/movies/{id}",
            get(router::handle_show_movie)
                .patch(router::handle_update_movie)
                .delete(router::handle_delete_movie),
        )
        .route("/v1/users/activated", put(router::handle_activate_user))
        .route("/v1/tokens/authentication", delete(router::handle_revoke_authentication_tokens))
        .fallback(router::handle_not_found)
        .with_state(state)
        .layer(axum_middleware::from_fn_with_state(auth, middleware::authenticate_middleware))
        .layer(axum_middleware::from_fn_with_state(
            rate_limiter,
            middleware::rate_limit_middleware,
        ))
        .layer(middleware::recover_layer())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES));

    middleware::with_request_timeout(routes, request_timeout)
        // propagate runs after set
        .layer(propagate_request_id)
        .layer(TraceLayer::new_for_http().make_span_with(middleware::make_request_span))
        .layer(set_request_id)
}
