//! HTTP API module for the health and track endpoints.

pub mod auth_gate;
pub mod handlers;
pub mod routes;

pub use handlers::AppState;
pub use routes::create_router;
