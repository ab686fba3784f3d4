//! Mock media engine connection.
//!
//! Records every call the router makes and lets tests push engine events
//! through the sink the worker installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use router_test_utils::MockEngine;
//!
//! let engine = MockEngine::new()
//!     .with_join_events(vec![candidate_event("candidate:1")]);
//!
//! // ... run a join through the worker ...
//!
//! assert_eq!(engine.join_calls().len(), 1);
//! engine.emit(offer_event("v=0"));
//! ```

use async_trait::async_trait;
use signal_router::engine::{EngineConnection, EngineEvent, EngineEventSender};
use signal_router::protocol::{IceCandidateInit, SessionDescription, TrickleTarget};
use signal_router::RouterError;
use std::sync::{Arc, Mutex};

/// SDP returned by a successful mock join or answer.
pub const MOCK_ANSWER_SDP: &str = "v=0\r\no=mock 0 0 IN IP4 127.0.0.1\r\n";

#[derive(Debug, Clone, Default)]
pub struct MockEngine {
    inner: Arc<Mutex<MockEngineInner>>,
}

#[derive(Debug, Default)]
struct MockEngineInner {
    sink: Option<EngineEventSender>,
    joins: Vec<(String, SessionDescription)>,
    answers: Vec<SessionDescription>,
    trickles: Vec<(IceCandidateInit, TrickleTarget)>,
    remote_descriptions: Vec<SessionDescription>,
    join_events: Vec<EngineEvent>,
    fail_join: bool,
    fail_answer: bool,
}

impl MockEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every `join` with `RouterError::Engine`.
    #[must_use]
    pub fn failing_join(self) -> Self {
        self.inner.lock().unwrap().fail_join = true;
        self
    }

    /// Fail every `answer` with `RouterError::Engine`.
    #[must_use]
    pub fn failing_answer(self) -> Self {
        self.inner.lock().unwrap().fail_answer = true;
        self
    }

    /// Events emitted through the sink while `join` is still running.
    #[must_use]
    pub fn with_join_events(self, events: Vec<EngineEvent>) -> Self {
        self.inner.lock().unwrap().join_events = events;
        self
    }

    /// Push an event through the installed sink. Returns false if no sink is
    /// installed or the receiving side is gone.
    pub fn emit(&self, event: EngineEvent) -> bool {
        let inner = self.inner.lock().unwrap();
        match &inner.sink {
            Some(sink) => sink.send(event).is_ok(),
            None => false,
        }
    }

    /// Drop the sink so the router's event forwarder sees the channel close.
    pub fn drop_sink(&self) {
        self.inner.lock().unwrap().sink = None;
    }

    pub fn has_sink(&self) -> bool {
        self.inner.lock().unwrap().sink.is_some()
    }

    /// `(sid, offer)` for every join call.
    pub fn join_calls(&self) -> Vec<(String, SessionDescription)> {
        self.inner.lock().unwrap().joins.clone()
    }

    pub fn answer_calls(&self) -> Vec<SessionDescription> {
        self.inner.lock().unwrap().answers.clone()
    }

    pub fn trickle_calls(&self) -> Vec<(IceCandidateInit, TrickleTarget)> {
        self.inner.lock().unwrap().trickles.clone()
    }

    pub fn remote_description_calls(&self) -> Vec<SessionDescription> {
        self.inner.lock().unwrap().remote_descriptions.clone()
    }
}

#[async_trait]
impl EngineConnection for MockEngine {
    fn set_event_sink(&self, sink: EngineEventSender) {
        self.inner.lock().unwrap().sink = Some(sink);
    }

    async fn join(
        &self,
        sid: &str,
        offer: SessionDescription,
    ) -> Result<SessionDescription, RouterError> {
        let mut inner = self.inner.lock().unwrap();
        inner.joins.push((sid.to_string(), offer));
        if inner.fail_join {
            return Err(RouterError::Engine("mock join failure".to_string()));
        }
        let events = std::mem::take(&mut inner.join_events);
        if let Some(sink) = &inner.sink {
            for event in events {
                let _ = sink.send(event);
            }
        }
        Ok(SessionDescription::answer(MOCK_ANSWER_SDP))
    }

    async fn answer(&self, offer: SessionDescription) -> Result<SessionDescription, RouterError> {
        let mut inner = self.inner.lock().unwrap();
        inner.answers.push(offer);
        if inner.fail_answer {
            return Err(RouterError::Engine("mock answer failure".to_string()));
        }
        Ok(SessionDescription::answer(MOCK_ANSWER_SDP))
    }

    async fn trickle(
        &self,
        candidate: IceCandidateInit,
        target: TrickleTarget,
    ) -> Result<(), RouterError> {
        self.inner
            .lock()
            .unwrap()
            .trickles
            .push((candidate, target));
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), RouterError> {
        self.inner
            .lock()
            .unwrap()
            .remote_descriptions
            .push(desc);
        Ok(())
    }
}

/// Candidate event for the publisher transport.
pub fn candidate_event(candidate: &str) -> EngineEvent {
    EngineEvent::IceCandidate {
        candidate: IceCandidateInit::new(candidate),
        target: TrickleTarget::Publisher,
    }
}

/// Engine-initiated renegotiation offer.
pub fn offer_event(sdp: &str) -> EngineEvent {
    EngineEvent::Offer(SessionDescription::offer(sdp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use signal_router::engine::event_channel;

    #[tokio::test]
    async fn test_join_records_and_emits_join_events() {
        let engine = MockEngine::new().with_join_events(vec![candidate_event("c1")]);
        let (tx, mut rx) = event_channel();
        engine.set_event_sink(tx);

        let answer = engine
            .join("room1", SessionDescription::offer("v=0"))
            .await
            .unwrap();

        assert_eq!(answer, SessionDescription::answer(MOCK_ANSWER_SDP));
        assert_eq!(engine.join_calls().len(), 1);
        assert_eq!(rx.recv().await, Some(candidate_event("c1")));
    }

    #[tokio::test]
    async fn test_failing_join_still_records_call() {
        let engine = MockEngine::new().failing_join();

        let result = engine.join("room1", SessionDescription::offer("v=0")).await;

        assert!(matches!(result, Err(RouterError::Engine(_))));
        assert_eq!(engine.join_calls().len(), 1);
    }

    #[test]
    fn test_emit_without_sink_returns_false() {
        let engine = MockEngine::new();
        assert!(!engine.emit(offer_event("v=0")));
    }
}
