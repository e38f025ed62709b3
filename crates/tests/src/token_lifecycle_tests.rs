//! Token lifecycle tests: activation, authentication, expiry, and revocation over HTTP.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::test_support::{request, TestApp};
use axum::http::{Method, StatusCode};
use chrono::Duration;
use sentinel_core::auth::{repository::UserRepository, token::TokenScope, User};
use serde_json::json;

fn valid_movie() -> serde_json::Value {
    json!({ "title": "Moana", "year": 2016, "runtime": "107 mins", "genres": ["animation"] })
}

#[tokio::test]
async fn test_activation_flow() {
    let app = TestApp::new().await;
    let mut user = User::new("Faith", "faith@example.com");
    app.state.users.create_user(&mut user).await.unwrap();
    let activation =
        app.state.tokens.issue(user.id, Duration::days(3), TokenScope::Activation).await.unwrap();

    let response = app
        .send(
            request(Method::PUT, "/v1/users/activated")
                .json(json!({ "token": activation.plaintext }))
                .build(),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["user"]["email"], "faith@example.com");
    assert_eq!(response.body["user"]["activated"], true);
    assert!(response.body["user"].get("version").is_none());
    assert!(app.state.users.get_user(user.id).await.unwrap().activated);

    // activation tokens are single use
    let response = app
        .send(
            request(Method::PUT, "/v1/users/activated")
                .json(json!({ "token": activation.plaintext }))
                .build(),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        response.body,
        json!({ "error": { "token": "invalid or expired activation token" } })
    );
}

#[tokio::test]
async fn test_activation_rejects_malformed_token() {
    let app = TestApp::new().await;

    let response = app
        .send(request(Method::PUT, "/v1/users/activated").json(json!({ "token": "abc" })).build())
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        response.body,
        json!({ "error": { "token": "invalid or expired activation token" } })
    );
}

#[tokio::test]
async fn test_authentication_token_cannot_activate() {
    let app = TestApp::new().await;
    let (_, auth_token) = app.user_with_token("scoped@example.com", false).await;

    let response = app
        .send(
            request(Method::PUT, "/v1/users/activated")
                .json(json!({ "token": auth_token }))
                .build(),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_activation_token_cannot_authenticate() {
    let app = TestApp::new().await;
    let mut user = User::new("Gil", "gil@example.com");
    app.state.users.create_user(&mut user).await.unwrap();
    let activation =
        app.state.tokens.issue(user.id, Duration::days(3), TokenScope::Activation).await.unwrap();

    let response = app
        .send(request(Method::GET, "/v1/healthcheck").bearer(&activation.plaintext).build())
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_write_routes_require_authentication_and_activation() {
    let app = TestApp::new().await;
    let (_, inactive_token) = app.user_with_token("inactive@example.com", false).await;
    let (_, active_token) = app.user_with_token("active@example.com", true).await;

    let anonymous =
        app.send(request(Method::POST, "/v1/movies").json(valid_movie()).build()).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        anonymous.body,
        json!({ "error": "you must be authenticated to access this resource" })
    );

    let inactive = app
        .send(
            request(Method::POST, "/v1/movies")
                .bearer(&inactive_token)
                .json(valid_movie())
                .build(),
        )
        .await;
    assert_eq!(inactive.status, StatusCode::FORBIDDEN);

    let active = app
        .send(request(Method::POST, "/v1/movies").bearer(&active_token).json(valid_movie()).build())
        .await;
    assert_eq!(active.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let app = TestApp::new().await;
    let mut user = User::new("Hana", "hana@example.com");
    app.state.users.create_user(&mut user).await.unwrap();
    let expired = app
        .state
        .tokens
        .issue(user.id, Duration::seconds(-60), TokenScope::Authentication)
        .await
        .unwrap();

    let response =
        app.send(request(Method::GET, "/v1/healthcheck").bearer(&expired.plaintext).build()).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body, json!({ "error": "invalid or missing authentication token" }));
}

#[tokio::test]
async fn test_revoking_authentication_tokens_logs_out_everywhere() {
    let app = TestApp::new().await;
    let (user, first) = app.user_with_token("ivy@example.com", true).await;
    let second = app
        .state
        .tokens
        .issue(user.id, Duration::hours(1), TokenScope::Authentication)
        .await
        .unwrap()
        .plaintext;
    let (_, bystander) = app.user_with_token("jon@example.com", true).await;

    let response =
        app.send(request(Method::DELETE, "/v1/tokens/authentication").bearer(&first).build()).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({ "message": "authentication tokens successfully revoked" }));

    for token in [&first, &second] {
        let response =
            app.send(request(Method::GET, "/v1/healthcheck").bearer(token).build()).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }

    let response =
        app.send(request(Method::GET, "/v1/healthcheck").bearer(&bystander).build()).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_anonymous_logout_requires_authentication() {
    let app = TestApp::new().await;

    let response = app.send(request(Method::DELETE, "/v1/tokens/authentication").build()).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.varies_on_authorization());
}
