//! Chat Room Backend Library
//!
//! Participants join with a display name, post and read messages, and are
//! pruned by a background sweep once they stop sending heartbeats.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod store;
pub mod sweeper;

use axum::http::{header, HeaderName, Method};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::{AppState, USER_HEADER};

/// Create the application router with the given state
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(state.config.cors_allowed_origins.as_deref());

    Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        // Participants
        .route("/participants", get(api::participants::list))
        .route("/participants", post(api::participants::create))
        .route("/status", post(api::status::heartbeat))
        // Messages
        .route("/messages", get(api::messages::list))
        .route("/messages", post(api::messages::create))
        // Metrics (Prometheus)
        .route("/metrics", get(api::metrics::metrics_handler))
        // OpenAPI
        .route("/api-docs/openapi.json", get(api::openapi::openapi_json))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Create CORS layer; any origin unless an allow-list is configured
fn cors_layer(allowed_origins: Option<&str>) -> CorsLayer {
    let Some(allowed_origins) = allowed_origins else {
        return CorsLayer::permissive();
    };

    let origins: Vec<_> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(USER_HEADER),
        ])
}
