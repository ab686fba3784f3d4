//! Observability for the signal router.
//!
//! # Logging
//!
//! All log events use `tracing` with a `router.*` target:
//! - `router.worker` - dispatch loop and join procedure
//! - `router.peer` - peer channel loops and engine event forwarding
//! - `router.queue` - queue backends
//! - `router.node` - process harness
//!
//! Message payloads (SDP, ICE candidates) are never logged; only ids, kinds and
//! error text are.
//!
//! # Metrics
//!
//! | Metric | Type | Labels | Purpose |
//! |--------|------|--------|---------|
//! | `router_requests_total` | Counter | `route` | Worker dispatch outcomes |
//! | `router_joins_total` | Counter | `status` | Join procedure outcomes |
//! | `router_join_duration_seconds` | Histogram | none | Join procedure latency |
//! | `router_replies_total` | Counter | `reply_type` | Replies enqueued to clients |
//! | `router_messages_dropped_total` | Counter | `reason` | Messages logged and dropped |
//! | `router_queue_errors_total` | Counter | `site` | Queue push/pop failures |
//! | `router_peer_channels_active` | Gauge | none | Live peer channels |

pub mod health;
pub mod metrics;

pub use self::health::{health_router, HealthState};
pub use self::metrics::init_metrics_recorder;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter`. Returns an error if a
/// global subscriber is already installed.
pub fn init_tracing(default_filter: &str) -> Result<(), String> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| format!("Failed to install tracing subscriber: {e}"))
}
