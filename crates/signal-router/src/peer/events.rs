//! Engine event forwarding.
//!
//! One task per connection drains the engine's event channel and turns
//! candidates and renegotiation offers into replies on the outbound topic.
//! Replies produced here carry no request id.

use crate::engine::{EngineEvent, EngineEventReceiver};
use crate::errors::RouterError;
use crate::observability::metrics;
use crate::protocol::{Reply, SignalReply};
use crate::queue::{enqueue_reply, Queue};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Spawn the forwarder for `pid`.
///
/// The task ends when every sender is dropped or `cancel_token` fires.
pub fn spawn_event_forwarder(
    pid: String,
    events: EngineEventReceiver,
    outbound: Arc<dyn Queue>,
    cancel_token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(forward_events(pid, events, outbound, cancel_token))
}

#[instrument(skip_all, name = "router.peer.events", fields(pid = %pid))]
async fn forward_events(
    pid: String,
    mut events: EngineEventReceiver,
    outbound: Arc<dyn Queue>,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;

            () = cancel_token.cancelled() => {
                debug!(target: "router.peer", pid = %pid, "Event forwarder cancelled");
                break;
            }

            event = events.recv() => {
                let Some(event) = event else {
                    debug!(target: "router.peer", pid = %pid, "Engine event channel closed");
                    break;
                };
                if cancel_token.is_cancelled() {
                    debug!(target: "router.peer", pid = %pid, "Event forwarder cancelled");
                    break;
                }
                if let Err(e) = forward_event(&pid, event, outbound.as_ref()).await {
                    warn!(
                        target: "router.peer",
                        pid = %pid,
                        error = %e,
                        "Failed to forward engine event"
                    );
                    metrics::record_message_dropped(e.kind());
                }
            }
        }
    }
}

async fn forward_event(
    pid: &str,
    event: EngineEvent,
    outbound: &dyn Queue,
) -> Result<(), RouterError> {
    match event {
        EngineEvent::IceCandidate { candidate, target } => {
            let reply = SignalReply::trickle(pid, &candidate, target)
                .map_err(|e| RouterError::Encode(format!("trickle: {e}")))?;
            enqueue_reply(outbound, &Reply::signal(reply)).await
        }
        EngineEvent::Offer(offer) => {
            debug!(target: "router.peer", pid = %pid, "Forwarding engine offer");
            let reply = SignalReply::description(pid, None, &offer)
                .map_err(|e| RouterError::Encode(format!("offer: {e}")))?;
            enqueue_reply(outbound, &Reply::signal(reply)).await
        }
        EngineEvent::IceConnectionStateChange(state) => {
            info!(
                target: "router.peer",
                pid = %pid,
                state = ?state,
                "ICE connection state changed"
            );
            Ok(())
        }
    }
}
