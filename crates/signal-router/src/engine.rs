//! Media engine connection interface.
//!
//! The engine owns SDP negotiation and media forwarding. The router only
//! drives it through [`EngineConnection`] and consumes the events it emits.

use crate::errors::RouterError;
use crate::protocol::{IceCandidateInit, IceConnectionState, SessionDescription, TrickleTarget};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Asynchronous notification from an engine connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Local ICE candidate gathered for one of the transports.
    IceCandidate {
        candidate: IceCandidateInit,
        target: TrickleTarget,
    },
    /// Engine-initiated renegotiation offer.
    Offer(SessionDescription),
    IceConnectionStateChange(IceConnectionState),
}

/// Sending half handed to the engine. Sends never block and may happen from
/// any thread.
pub type EngineEventSender = mpsc::UnboundedSender<EngineEvent>;

/// Receiving half drained by the connection's event forwarder.
pub type EngineEventReceiver = mpsc::UnboundedReceiver<EngineEvent>;

/// Create a connected sender/receiver pair.
#[must_use]
pub fn event_channel() -> (EngineEventSender, EngineEventReceiver) {
    mpsc::unbounded_channel()
}

/// One client's session on the media engine.
#[async_trait]
pub trait EngineConnection: Send + Sync {
    /// Install the event sink. Called once, before [`join`](Self::join), so
    /// events produced during negotiation are captured.
    fn set_event_sink(&self, sink: EngineEventSender);

    /// Join room `sid` with the client's offer and return the answer.
    async fn join(&self, sid: &str, offer: SessionDescription)
        -> Result<SessionDescription, RouterError>;

    /// Answer a client renegotiation offer.
    async fn answer(&self, offer: SessionDescription) -> Result<SessionDescription, RouterError>;

    /// Add a remote ICE candidate to the given transport.
    async fn trickle(
        &self,
        candidate: IceCandidateInit,
        target: TrickleTarget,
    ) -> Result<(), RouterError>;

    /// Apply the client's answer to an engine-initiated offer.
    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), RouterError>;
}
