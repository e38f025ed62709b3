//! HTTP surface of the Sentinel resource server: axum middleware adapters, error rendering,
//! route handlers, and the [`app::create_app`] assembly.

pub mod app;
pub mod errors;
pub mod middleware;
pub mod router;
