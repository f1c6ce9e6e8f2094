//! HTTP API for the Keywarden server

pub mod error;
pub mod handlers;

use axum::{
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use handlers::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint
///
/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    // Browser clients are served from another origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        // Keys
        .route("/api/keys", get(handlers::list_keys).post(handlers::create_key))
        .route(
            "/api/keys/{id}",
            get(handlers::get_key)
                .put(handlers::update_key)
                .delete(handlers::delete_key),
        )
        .route("/api/keys/by-number/{key_number}", get(handlers::get_key_by_number))
        // Verifications
        .route(
            "/api/verifications",
            get(handlers::list_verifications).post(handlers::create_verification),
        )
        // Settings
        .route("/api/settings", get(handlers::get_settings))
        .route("/api/settings/{id}", put(handlers::update_settings))
        // Pending verifications
        .route(
            "/api/pending-verifications",
            get(handlers::list_pending_verifications).post(handlers::create_pending_verification),
        )
        .route(
            "/api/pending-verifications/active",
            get(handlers::get_active_pending_verification),
        )
        .route(
            "/api/pending-verifications/random",
            post(handlers::create_random_pending_verification),
        )
        .route(
            "/api/pending-verifications/{id}/complete",
            put(handlers::complete_pending_verification),
        )
        // Dashboard
        .route("/api/activity", get(handlers::get_activity))
        .route("/api/summary", get(handlers::get_summary))
        .route("/api/generate-device-id", get(handlers::generate_device_id))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
