//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - Auth routes over the `AuthService`
//! - Bearer-token middleware and the `AuthUser` extractor
//! - Error-to-response mapping

pub mod error;
pub mod middleware;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::{StatusCode, header::AUTHORIZATION},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::sensitive_headers::SetSensitiveRequestHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use upwatch_core::auth::AuthService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Authentication coordinator.
    pub auth: Arc<AuthService>,
}

/// Creates the main application router.
///
/// Requests running longer than `request_timeout` are answered with 408; the
/// handler future is dropped, cancelling any store call in flight. Bearer
/// tokens are marked sensitive so request tracing never prints them.
pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(SetSensitiveRequestHeadersLayer::new([AUTHORIZATION]))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
