#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::{
    body::{to_bytes, Body},
    extract::ConnectInfo,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use chrono::Duration as ChronoDuration;
use sentinel_core::{
    auth::{repository::UserRepository, token::TokenScope, User},
    middleware::RateLimiter,
    storage::connect_in_memory,
};
use serde_json::Value;
use server::app::{create_app, AppState};
use sqlx::SqlitePool;
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
    time::Duration,
};
use tower::ServiceExt;

pub const CLIENT_IP: IpAddr = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7));

/// A fully wired application over its own in-memory database.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub pool: SqlitePool,
    pub limiter: Arc<RateLimiter>,
}

impl TestApp {
    /// App with a limiter generous enough that no test trips it by accident.
    pub async fn new() -> Self {
        Self::with_limiter(RateLimiter::new(1000.0, 1000)).await
    }

    pub async fn with_limiter(limiter: RateLimiter) -> Self {
        let pool = connect_in_memory().await.expect("in-memory database");
        let state = AppState::from_pool(pool.clone(), Duration::from_secs(3), "testing");
        let limiter = Arc::new(limiter);
        let router = create_app(state.clone(), limiter.clone(), Duration::from_secs(10));

        Self { router, state, pool, limiter }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse { status, headers, body }
    }

    /// Creates a user and hands back a live authentication token for them.
    pub async fn user_with_token(&self, email: &str, activated: bool) -> (User, String) {
        let mut user = User::new("Test User", email);
        self.state.users.create_user(&mut user).await.unwrap();
        if activated {
            self.state.users.activate_user(&mut user).await.unwrap();
        }

        let token = self
            .state
            .tokens
            .issue(user.id, ChronoDuration::hours(1), TokenScope::Authentication)
            .await
            .unwrap();

        (user, token.plaintext)
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn varies_on_authorization(&self) -> bool {
        self.headers
            .get_all(header::VARY)
            .iter()
            .any(|value| value.to_str().is_ok_and(|v| v.eq_ignore_ascii_case("authorization")))
    }
}

/// Builds a request from [`CLIENT_IP`].
pub fn request(method: Method, uri: &str) -> RequestBuilder {
    RequestBuilder {
        method,
        uri: uri.to_string(),
        client: CLIENT_IP,
        headers: Vec::new(),
        body: None,
    }
}

pub struct RequestBuilder {
    method: Method,
    uri: String,
    client: IpAddr,
    headers: Vec<(String, String)>,
    body: Option<Value>,
}

impl RequestBuilder {
    pub fn bearer(self, token: &str) -> Self {
        self.header("authorization", &format!("Bearer {token}"))
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn from_client(mut self, client: IpAddr) -> Self {
        self.client = client;
        self
    }

    pub fn build(self) -> Request<Body> {
        let mut builder = Request::builder().method(self.method).uri(self.uri);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let body = match self.body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let mut request = builder.body(body).unwrap();
        request.extensions_mut().insert(ConnectInfo(SocketAddr::new(self.client, 50_000)));
        request
    }
}
