//! Prometheus metrics for request outcomes and dependency latency.
//!
//! This module provides metrics for:
//! - Tracked URL creations and duplicate rejections
//! - Auth gate rejections by reason
//! - Token validation latency
//! - Store operation latency

use std::time::{Duration, Instant};

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tokio::task::JoinHandle;
use tracing::debug;

// === Metric Name Constants ===

/// Tracked URLs created counter metric name.
pub const METRIC_TRACKED_CREATED: &str = "tracked_urls_created_total";
/// Duplicate rejections counter metric name.
pub const METRIC_TRACKED_DUPLICATE: &str = "tracked_urls_duplicate_total";
/// Invalid track requests counter metric name.
pub const METRIC_TRACK_INVALID: &str = "track_requests_invalid_total";
/// Auth rejections counter metric name.
pub const METRIC_AUTH_REJECTIONS: &str = "auth_rejections_total";
/// Token validation latency metric name.
pub const METRIC_TOKEN_VALIDATION_LATENCY: &str = "token_validation_latency_ms";
/// Store operation latency metric name.
pub const METRIC_STORE_LATENCY: &str = "store_operation_latency_ms";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_histogram!(
        METRIC_TOKEN_VALIDATION_LATENCY,
        "Outbound token validation latency in milliseconds"
    );
    describe_histogram!(
        METRIC_STORE_LATENCY,
        "Store operation latency in milliseconds"
    );

    describe_counter!(METRIC_TRACKED_CREATED, "Total number of URLs tracked");
    describe_counter!(
        METRIC_TRACKED_DUPLICATE,
        "Total number of track requests rejected as duplicates"
    );
    describe_counter!(
        METRIC_TRACK_INVALID,
        "Total number of track requests with a malformed body"
    );
    describe_counter!(
        METRIC_AUTH_REJECTIONS,
        "Total number of requests rejected by the auth gate"
    );

    debug!("Metrics initialized");
}

/// Install the global Prometheus recorder and return its render handle.
pub fn install_prometheus() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    init_metrics();
    Ok(handle)
}

/// Interval between recorder upkeep runs.
pub const UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Periodically drain histogram buffers so memory stays bounded between
/// scrapes. `install_recorder` does not do this on its own.
pub fn spawn_upkeep(handle: PrometheusHandle, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            handle.run_upkeep();
        }
    })
}

/// Record outbound token validation latency.
pub fn record_token_validation_latency(start: Instant) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_TOKEN_VALIDATION_LATENCY).record(latency_ms);
}

/// Increment tracked URL created counter.
pub fn inc_tracked_created() {
    counter!(METRIC_TRACKED_CREATED).increment(1);
}

/// Increment duplicate rejection counter.
pub fn inc_tracked_duplicate() {
    counter!(METRIC_TRACKED_DUPLICATE).increment(1);
}

/// Increment malformed track request counter.
pub fn inc_track_invalid() {
    counter!(METRIC_TRACK_INVALID).increment(1);
}

/// Increment auth rejection counter.
pub fn inc_auth_rejection(reason: &'static str) {
    counter!(METRIC_AUTH_REJECTIONS, "reason" => reason).increment(1);
}

/// RAII guard for timing store operations.
/// Records latency when dropped.
pub struct LatencyTimer {
    start: Instant,
    op: &'static str,
}

impl LatencyTimer {
    /// Create a new latency timer for the given store operation.
    pub fn new(op: &'static str) -> Self {
        Self {
            start: Instant::now(),
            op,
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        histogram!(METRIC_STORE_LATENCY, "op" => self.op).record(self.elapsed_ms());
    }
}

/// Create a latency timer for a store operation.
pub fn timer_store_operation(op: &'static str) -> LatencyTimer {
    LatencyTimer::new(op)
}
