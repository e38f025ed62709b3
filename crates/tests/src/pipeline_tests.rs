//! Middleware pipeline tests
//!
//! The server answers every request through: recover → rate limit → authenticate → handler.
//! These tests check that each stage short-circuits where it should and that the stages
//! compose in that order.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::test_support::{request, TestApp, CLIENT_IP};
use axum::{
    http::{header, Method, StatusCode},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use sentinel_core::middleware::{BearerAuth, RateLimiter};
use serde_json::json;
use server::middleware::{
    authenticate_middleware, rate_limit_middleware, recover_layer, with_request_timeout,
};
use std::{
    net::{IpAddr, Ipv4Addr},
    sync::Arc,
    time::Duration,
};

#[tokio::test]
async fn test_anonymous_healthcheck_is_served() {
    let app = TestApp::new().await;

    let response = app.send(request(Method::GET, "/v1/healthcheck").build()).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "available");
    assert_eq!(response.body["environment"], "testing");
    assert!(response.varies_on_authorization());
}

#[tokio::test]
async fn test_unknown_route_is_not_found_json() {
    let app = TestApp::new().await;

    let response = app.send(request(Method::GET, "/v1/nothing-here").build()).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body, json!({ "error": "the requested resource could not be found" }));
}

#[tokio::test]
async fn test_every_auth_outcome_varies_on_authorization() {
    let app = TestApp::new().await;
    let (_, token) = app.user_with_token("vary@example.com", true).await;

    let outcomes = [
        request(Method::GET, "/v1/healthcheck").build(),
        request(Method::GET, "/v1/healthcheck").bearer(&token).build(),
        request(Method::GET, "/v1/healthcheck").bearer("ABCDEFGHIJKLMNOPQRSTUVWXYZ").build(),
        request(Method::GET, "/v1/healthcheck").header("authorization", "Token abc").build(),
        request(Method::GET, "/v1/healthcheck").bearer("too-short").build(),
    ];

    for req in outcomes {
        let response = app.send(req).await;
        assert!(response.varies_on_authorization(), "missing Vary on {}", response.status);
    }
}

#[tokio::test]
async fn test_invalid_credentials_are_rejected_with_challenge() {
    let app = TestApp::new().await;

    let headers =
        ["Bearer", "Basic dXNlcjpwYXNz", "Bearer a b", "Bearer ABCDEFGHIJKLMNOPQRSTUVWXY"];

    for value in headers {
        let response = app
            .send(request(Method::GET, "/v1/healthcheck").header("authorization", value).build())
            .await;

        assert_eq!(response.status, StatusCode::UNAUTHORIZED, "header {value:?}");
        assert_eq!(response.header("www-authenticate"), Some("Bearer"));
        assert_eq!(response.body, json!({ "error": "invalid or missing authentication token" }));
    }
}

#[tokio::test]
async fn test_rate_limit_rejects_after_burst() {
    let app = TestApp::with_limiter(RateLimiter::new(0.5, 2)).await;

    for _ in 0..2 {
        let response = app.send(request(Method::GET, "/v1/healthcheck").build()).await;
        assert_eq!(response.status, StatusCode::OK);
    }

    let response = app.send(request(Method::GET, "/v1/healthcheck").build()).await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.body, json!({ "error": "rate limit exceeded" }));
    assert_eq!(app.limiter.client_count(), 1);
}

#[tokio::test]
async fn test_rate_limit_is_per_client() {
    let app = TestApp::with_limiter(RateLimiter::new(0.5, 1)).await;
    let other = IpAddr::V4(Ipv4Addr::new(198, 51, 100, 20));

    let first = app.send(request(Method::GET, "/v1/healthcheck").build()).await;
    let second = app.send(request(Method::GET, "/v1/healthcheck").build()).await;
    let neighbour =
        app.send(request(Method::GET, "/v1/healthcheck").from_client(other).build()).await;

    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(second.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(neighbour.status, StatusCode::OK);
    assert!(app.limiter.tokens_for(CLIENT_IP).is_some());
    assert!(app.limiter.tokens_for(other).is_some());
}

#[tokio::test]
async fn test_rate_limit_runs_before_authentication() {
    let app = TestApp::with_limiter(RateLimiter::new(0.5, 1)).await;

    let _ = app.send(request(Method::GET, "/v1/healthcheck").build()).await;

    // an invalid credential would be a 401, but the limiter answers first
    let response = app
        .send(request(Method::GET, "/v1/healthcheck").bearer("ABCDEFGHIJKLMNOPQRSTUVWXYZ").build())
        .await;

    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_disabled_limiter_admits_everything() {
    let app = TestApp::with_limiter(RateLimiter::new(0.5, 1).with_enabled(false)).await;

    for _ in 0..10 {
        let response = app.send(request(Method::GET, "/v1/healthcheck").build()).await;
        assert_eq!(response.status, StatusCode::OK);
    }

    assert_eq!(app.limiter.client_count(), 0);
}

#[tokio::test]
async fn test_backend_failure_during_authentication_is_server_error() {
    let app = TestApp::new().await;
    app.pool.close().await;

    let response = app
        .send(request(Method::GET, "/v1/healthcheck").bearer("ABCDEFGHIJKLMNOPQRSTUVWXYZ").build())
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.varies_on_authorization());
    assert_eq!(
        response.body,
        json!({ "error": "the server encountered a problem and could not process your request" })
    );
}

#[tokio::test]
async fn test_anonymous_request_skips_backend() {
    let app = TestApp::new().await;
    app.pool.close().await;

    // no header means no lookup, so a dead database does not matter
    let response = app.send(request(Method::GET, "/v1/healthcheck").build()).await;

    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = TestApp::new().await;

    let response = app
        .send(request(Method::GET, "/v1/healthcheck").header("x-request-id", "req-42").build())
        .await;
    assert_eq!(response.header("x-request-id"), Some("req-42"));

    let response = app.send(request(Method::GET, "/v1/healthcheck").build()).await;
    assert!(response.header("x-request-id").is_some_and(|id| !id.is_empty()));
}

async fn panicking_handler() -> &'static str {
    panic!("handler exploded")
}

async fn ok_handler() -> &'static str {
    "ok"
}

#[tokio::test]
async fn test_panic_behind_full_pipeline_is_recovered() {
    let app = TestApp::new().await;
    let auth = Arc::new(BearerAuth::new(app.state.tokens.clone()));

    let router = Router::new()
        .route("/panic", get(panicking_handler))
        .route("/ok", get(ok_handler))
        .layer(from_fn_with_state(auth, authenticate_middleware))
        .layer(from_fn_with_state(app.limiter.clone(), rate_limit_middleware))
        .layer(recover_layer());
    let app = TestApp { router, ..app };

    let response = app.send(request(Method::GET, "/panic").build()).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.header(header::CONNECTION.as_str()), Some("close"));
    assert!(response.varies_on_authorization());
    assert_eq!(
        response.body,
        json!({ "error": "the server encountered a problem and could not process your request" })
    );

    // the service keeps serving after a panic
    let response = app.send(request(Method::GET, "/ok").build()).await;
    assert_eq!(response.status, StatusCode::OK);
}

async fn stalled_handler() -> &'static str {
    tokio::time::sleep(Duration::from_secs(30)).await;
    "too late"
}

#[tokio::test]
async fn test_request_timeout_behind_full_pipeline_uses_envelope() {
    let app = TestApp::new().await;
    let auth = Arc::new(BearerAuth::new(app.state.tokens.clone()));

    let routes = Router::new()
        .route("/stalled", get(stalled_handler))
        .route("/ok", get(ok_handler))
        .layer(from_fn_with_state(auth, authenticate_middleware))
        .layer(from_fn_with_state(app.limiter.clone(), rate_limit_middleware))
        .layer(recover_layer());
    let router = with_request_timeout(routes, Duration::from_millis(50));
    let app = TestApp { router, ..app };

    let response = app.send(request(Method::GET, "/stalled").build()).await;
    assert_eq!(response.status, StatusCode::REQUEST_TIMEOUT);
    assert!(response.varies_on_authorization());
    assert_eq!(response.body, json!({ "error": "the request took too long to process" }));

    let response = app.send(request(Method::GET, "/ok").build()).await;
    assert_eq!(response.status, StatusCode::OK);
}
