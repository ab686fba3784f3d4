//! Metrics definitions for the signal router.
//!
//! All metrics follow Prometheus naming conventions:
//! - `router_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Every label value comes from a fixed set in code (payload kinds, error
//! kinds, call sites). Connection and room ids are never used as labels.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the Prometheus recorder and return its handle.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Join covers engine negotiation, so allow multi-second tails
        .set_buckets_for_metric(
            Matcher::Full("router_join_duration_seconds".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000,
                25.000,
            ],
        )
        .map_err(|e| format!("Failed to set join duration buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus metrics recorder: {e}"))
}

/// Record a worker dispatch decision.
///
/// Metric: `router_requests_total`
/// Labels: `route` (signal, room_admin, ignored)
pub fn record_request(route: &'static str) {
    counter!("router_requests_total", "route" => route).increment(1);
}

/// Record the outcome and latency of a join procedure.
///
/// Metrics: `router_joins_total`, `router_join_duration_seconds`
/// Labels: `status` (success, or an error kind)
pub fn record_join(status: &'static str, duration: Duration) {
    counter!("router_joins_total", "status" => status).increment(1);
    histogram!("router_join_duration_seconds").record(duration.as_secs_f64());
}

/// Metric: `router_replies_total`
/// Labels: `reply_type` (join, description, trickle)
pub fn record_reply(reply_type: &'static str) {
    counter!("router_replies_total", "reply_type" => reply_type).increment(1);
}

/// Record a message that was logged and dropped.
///
/// Metric: `router_messages_dropped_total`
/// Labels: `reason` (bounded by error kinds and unexpected payload kinds)
pub fn record_message_dropped(reason: &'static str) {
    counter!("router_messages_dropped_total", "reason" => reason).increment(1);
}

/// Metric: `router_queue_errors_total`
/// Labels: `site` (worker_pop, peer_pop, enqueue)
pub fn record_queue_error(site: &'static str) {
    counter!("router_queue_errors_total", "site" => site).increment(1);
}

/// Metric: `router_peer_channels_active`
pub fn set_peer_channels_active(count: usize) {
    // usize to f64 conversion is safe for realistic channel counts
    #[allow(clippy::cast_precision_loss)]
    gauge!("router_peer_channels_active").set(count as f64);
}
