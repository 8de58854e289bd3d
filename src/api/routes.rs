//! HTTP API route definitions.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::auth_gate::require_bearer;
use super::handlers::{health, metrics_text, track, AppState};

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    // Only matched routes pass through the gate; unknown /track paths 404.
    let tracking = Router::new()
        .route("/track", post(track))
        .route("/track/", post(track))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_text))
        .merge(tracking)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Create a minimal health-only router.
pub fn health_router() -> Router {
    Router::new().route("/health", get(health))
}
