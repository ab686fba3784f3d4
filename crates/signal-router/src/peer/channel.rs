//! `PeerChannel` - per-connection signaling loop.
//!
//! Each channel:
//! - Owns one engine connection after a successful join
//! - Consumes `{ns}peer/{pid}/to` and enqueues replies on `{ns}peer/{pid}/from`
//! - Is the only consumer of its inbound topic while registered
//!
//! # Lifecycle
//!
//! 1. Spawned by the worker once the join answer has been enqueued
//! 2. Runs until a `Kill` arrives or its registration is cancelled
//! 3. On `Kill` the manager closes the connection; on cancellation the
//!    connection is left to whichever join replaced it

use super::registry::PeerRegistry;
use crate::engine::EngineConnection;
use crate::errors::RouterError;
use crate::manager::Manager;
use crate::observability::metrics;
use crate::protocol::{
    decode_request, Command, IceCandidateInit, Negotiation, Reply, SdpType, SessionDescription,
    SignalPayload, SignalReply, SignalRequest, Trickle,
};
use crate::queue::{enqueue_reply, Queue};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Everything a channel needs to serve one connection.
pub struct PeerSession {
    pub pid: String,
    /// Room the connection joined.
    pub sid: String,
    pub engine: Arc<dyn EngineConnection>,
    pub inbound: Arc<dyn Queue>,
    pub outbound: Arc<dyn Queue>,
}

/// Handle to a running `PeerChannel`.
#[derive(Clone, Debug)]
pub struct PeerChannelHandle {
    pid: String,
    generation: u64,
}

impl PeerChannelHandle {
    #[must_use]
    pub fn pid(&self) -> &str {
        &self.pid
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Outcome of handling one inbound message.
enum Flow {
    Continue,
    Closed,
}

pub struct PeerChannel {
    session: PeerSession,
    manager: Arc<dyn Manager>,
    registry: Arc<PeerRegistry>,
    generation: u64,
    cancel_token: CancellationToken,
    messages_processed: u64,
}

impl PeerChannel {
    /// Spawn a channel for a registered session.
    ///
    /// `cancel_token` and `generation` come from the pid's registration; the
    /// channel removes its registry entry on exit if it still owns it.
    pub fn spawn(
        session: PeerSession,
        manager: Arc<dyn Manager>,
        registry: Arc<PeerRegistry>,
        generation: u64,
        cancel_token: CancellationToken,
    ) -> (PeerChannelHandle, JoinHandle<()>) {
        let handle = PeerChannelHandle {
            pid: session.pid.clone(),
            generation,
        };

        let channel = Self {
            session,
            manager,
            registry,
            generation,
            cancel_token,
            messages_processed: 0,
        };

        let task = tokio::spawn(channel.run());
        (handle, task)
    }

    #[instrument(
        skip_all,
        name = "router.peer.channel",
        fields(pid = %self.session.pid, sid = %self.session.sid)
    )]
    async fn run(mut self) {
        debug!(
            target: "router.peer",
            pid = %self.session.pid,
            generation = self.generation,
            "PeerChannel started"
        );

        loop {
            tokio::select! {
                biased;

                () = self.cancel_token.cancelled() => {
                    debug!(
                        target: "router.peer",
                        pid = %self.session.pid,
                        "PeerChannel received cancellation signal"
                    );
                    break;
                }

                popped = self.session.inbound.block_until_next(Duration::ZERO) => {
                    match popped {
                        Ok(bytes) => {
                            self.messages_processed += 1;
                            if let Flow::Closed = self.handle_message(&bytes).await {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!(
                                target: "router.peer",
                                pid = %self.session.pid,
                                error = %e,
                                "Failed to read peer queue"
                            );
                            metrics::record_queue_error("peer_pop");
                            tokio::task::yield_now().await;
                        }
                    }
                }
            }
        }

        self.registry.remove(&self.session.pid, self.generation);

        info!(
            target: "router.peer",
            pid = %self.session.pid,
            messages_processed = self.messages_processed,
            "PeerChannel stopped"
        );
    }

    /// Handle one raw queue entry. Failures are logged and the entry dropped.
    async fn handle_message(&self, bytes: &[u8]) -> Flow {
        let request = match decode_request(bytes) {
            Ok(request) => request,
            Err(e) => {
                self.drop_message(&e);
                return Flow::Continue;
            }
        };

        let signal = match &request.command {
            Command::Signal(signal) => signal,
            Command::RoomAdmin(_) => {
                warn!(
                    target: "router.peer",
                    pid = %self.session.pid,
                    action = %request.action,
                    "Unexpected room admin command on peer topic"
                );
                metrics::record_message_dropped("unexpected_command");
                return Flow::Continue;
            }
        };

        let result = match &signal.payload {
            SignalPayload::Kill => {
                self.handle_kill().await;
                return Flow::Closed;
            }
            SignalPayload::Description(text) => self.handle_description(signal, text).await,
            SignalPayload::Trickle(trickle) => self.handle_trickle(trickle).await,
            SignalPayload::Join(_) => {
                warn!(
                    target: "router.peer",
                    pid = %self.session.pid,
                    "Unexpected join on peer topic"
                );
                metrics::record_message_dropped("unexpected_join");
                Ok(())
            }
        };

        if let Err(e) = result {
            self.drop_message(&e);
        }
        Flow::Continue
    }

    fn drop_message(&self, error: &RouterError) {
        warn!(
            target: "router.peer",
            pid = %self.session.pid,
            error = %error,
            "Dropping peer message"
        );
        metrics::record_message_dropped(error.kind());
    }

    async fn handle_kill(&self) {
        debug!(target: "router.peer", pid = %self.session.pid, "Kill received");
        // Stop the event forwarder first; events raised while the engine
        // closes must not reach the client.
        self.cancel_token.cancel();
        self.manager.close_connection(&self.session.pid).await;
    }

    async fn handle_description(
        &self,
        signal: &SignalRequest,
        text: &str,
    ) -> Result<(), RouterError> {
        let negotiation: Negotiation = serde_json::from_str(text)
            .map_err(|e| RouterError::Decode(format!("negotiation: {e}")))?;

        match negotiation.desc.sdp_type {
            SdpType::Answer => {
                debug!(target: "router.peer", pid = %self.session.pid, "Applying client answer");
                self.session
                    .engine
                    .set_remote_description(negotiation.desc)
                    .await
            }
            SdpType::Offer => self.handle_offer(signal, negotiation.desc).await,
            SdpType::Pranswer | SdpType::Rollback => {
                debug!(
                    target: "router.peer",
                    pid = %self.session.pid,
                    sdp_type = %negotiation.desc.sdp_type,
                    "Ignoring description"
                );
                Ok(())
            }
        }
    }

    async fn handle_offer(
        &self,
        signal: &SignalRequest,
        offer: SessionDescription,
    ) -> Result<(), RouterError> {
        let room = self.manager.get_room_data(&self.session.sid).await?;

        if let Err(e) = self
            .manager
            .validate_offer(&room, &self.session.pid, &offer)
            .await
        {
            info!(
                target: "router.peer",
                pid = %self.session.pid,
                error = %e,
                "Rejected offer"
            );
            return Err(e);
        }

        let answer = self.session.engine.answer(offer).await?;
        let reply = SignalReply::description(
            self.session.pid.clone(),
            Some(signal.request_id.clone()),
            &answer,
        )
        .map_err(|e| RouterError::Encode(format!("answer: {e}")))?;

        enqueue_reply(self.session.outbound.as_ref(), &Reply::signal(reply)).await
    }

    async fn handle_trickle(&self, trickle: &Trickle) -> Result<(), RouterError> {
        let candidate: IceCandidateInit = serde_json::from_str(&trickle.init)
            .map_err(|e| RouterError::Decode(format!("ice candidate: {e}")))?;

        self.session
            .engine
            .trickle(candidate, trickle.target)
            .await
    }
}
