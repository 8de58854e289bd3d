//! HTTP API handlers.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, instrument, warn};

use crate::auth::{HttpTokenValidator, TokenValidator};
use crate::config::{Config, StorageBackend};
use crate::error::ApiError;
use crate::metrics;
use crate::store::{InMemoryStore, PostgresStore, TrackedUrlStore};

/// Fixed health check body.
pub const HEALTH_BODY: &str = "Service is up and running";

/// Confirmation message on successful tracking.
pub const TRACKED_MESSAGE: &str = "URL tracked successfully";

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Persistence gateway.
    pub store: Arc<dyn TrackedUrlStore>,
    /// Token validator; `None` when the deployment is misconfigured.
    pub validator: Option<Arc<dyn TokenValidator>>,
    /// Prometheus render handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new app state.
    pub fn new(store: Arc<dyn TrackedUrlStore>, validator: Arc<dyn TokenValidator>) -> Self {
        Self {
            store,
            validator: Some(validator),
            metrics: None,
        }
    }

    /// Build the store and validator described by `config`.
    ///
    /// Fails when the validation endpoint is unset, so a misconfigured
    /// deployment never starts serving.
    pub async fn from_config(config: &Config) -> crate::Result<Self> {
        let store: Arc<dyn TrackedUrlStore> = match config.storage {
            StorageBackend::Postgres => Arc::new(PostgresStore::connect(config).await?),
            StorageBackend::Memory => {
                warn!("Using in-memory storage; tracked URLs are lost on restart");
                Arc::new(InMemoryStore::new())
            }
        };

        let validator = HttpTokenValidator::from_config(config)?;
        info!(endpoint = %validator.url(), "Token validation endpoint configured");

        Ok(Self::new(store, Arc::new(validator)))
    }

    /// State with no validator. Every authenticated request gets a 500.
    pub fn without_validator(store: Arc<dyn TrackedUrlStore>) -> Self {
        Self {
            store,
            validator: None,
            metrics: None,
        }
    }

    /// Attach a Prometheus handle for `/metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("validator_configured", &self.validator.is_some())
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

/// Track request body.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackRequest {
    /// URL to record.
    pub target_url: String,
}

impl TrackRequest {
    /// Build from a decoded JSON object.
    ///
    /// The body is extracted as a map first: a derived struct `Deserialize`
    /// also accepts the sequence form `["..."]`, which is not a valid body.
    pub fn from_object(object: Map<String, Value>) -> Result<Self, ApiError> {
        serde_json::from_value(Value::Object(object))
            .map_err(|e| ApiError::InvalidBody(e.to_string()))
    }
}

/// Track success response.
#[derive(Debug, Serialize)]
pub struct TrackResponse {
    /// Confirmation message.
    pub message: &'static str,
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, HEALTH_BODY)
}

/// Record a target URL unless it is already tracked.
///
/// The lookup is only a fast path. Two concurrent requests can both miss it;
/// the loser's insert hits the store's unique constraint and comes back as
/// [`ApiError::AlreadyTracked`].
#[instrument(name = "HTTP: Track request", skip(state, payload))]
pub async fn track(
    State(state): State<AppState>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = payload
        .map_err(|rejection| ApiError::InvalidBody(rejection.body_text()))
        .and_then(|Json(object)| TrackRequest::from_object(object))
        .map_err(|e| {
            metrics::inc_track_invalid();
            warn!(reason = %e, "rejecting malformed track request");
            e
        })?;

    if request.target_url.is_empty() {
        metrics::inc_track_invalid();
        return Err(ApiError::EmptyTargetUrl);
    }

    let target_url = request.target_url.as_str();

    if state.store.find_by_target_url(target_url).await?.is_some() {
        metrics::inc_tracked_duplicate();
        info!(target_url, "target url already tracked");
        return Err(ApiError::AlreadyTracked);
    }

    let row = state.store.insert(target_url).await.map_err(|e| {
        let err = ApiError::from(e);
        if matches!(err, ApiError::AlreadyTracked) {
            metrics::inc_tracked_duplicate();
        }
        err
    })?;

    metrics::inc_tracked_created();
    info!(id = row.id, target_url, "target url tracked");

    Ok((
        StatusCode::CREATED,
        Json(TrackResponse {
            message: TRACKED_MESSAGE,
        }),
    ))
}

/// Prometheus exposition handler.
pub async fn metrics_text(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, String::new()),
    }
}
