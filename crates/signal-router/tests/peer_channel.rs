//! Peer channel tests: per-connection message handling after a join.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use router_test_utils::*;
use signal_router::engine::EngineEvent;
use signal_router::protocol::{
    IceConnectionState, RoomOptions, SdpType, SessionDescription, SignalReplyPayload,
    TrickleTarget,
};
use std::sync::Arc;

#[tokio::test]
async fn test_trickles_reach_engine_in_order() {
    let manager = MockManager::new().with_room("room1");
    let worker = test_worker(&manager);
    let peer = TestPeer::new("peerA", "room1");
    let engine = join_peer(&manager, &worker, &peer).await;

    let targets = [
        TrickleTarget::Publisher,
        TrickleTarget::Subscriber,
        TrickleTarget::Publisher,
    ];
    for (i, target) in targets.iter().enumerate() {
        peer.send(&manager, &peer.trickle(&format!("candidate:{i}"), *target))
            .await;
    }

    wait_until("three trickles", || engine.trickle_calls().len() == 3).await;

    let calls = engine.trickle_calls();
    let candidates: Vec<&str> = calls.iter().map(|(c, _)| c.candidate.as_str()).collect();
    assert_eq!(candidates, vec!["candidate:0", "candidate:1", "candidate:2"]);
    let seen_targets: Vec<TrickleTarget> = calls.iter().map(|(_, t)| *t).collect();
    assert_eq!(seen_targets, targets.to_vec());
    assert_eq!(peer.pending_replies(&manager).await, 0);
}

#[tokio::test]
async fn test_kill_closes_connection_and_ends_channel() {
    let manager = MockManager::new().with_room("room1");
    let worker = test_worker(&manager);
    let peer = TestPeer::new("peerA", "room1");
    let engine = join_peer(&manager, &worker, &peer).await;

    peer.send(&manager, &peer.kill()).await;

    wait_until("channel removed", || !worker.is_channel_active("peerA")).await;
    assert_eq!(manager.closed_connections(), vec!["peerA"]);

    // Engine events after kill are not forwarded.
    engine.emit(EngineEvent::Offer(SessionDescription::offer("v=0")));
    peer.send(&manager, &peer.trickle("candidate:late", TrickleTarget::Publisher))
        .await;
    assert!(peer.next_reply(&manager).await.is_none());
    assert!(engine.trickle_calls().is_empty());
    assert_eq!(manager.closed_connections().len(), 1);
}

#[tokio::test]
async fn test_events_raised_while_closing_are_not_forwarded() {
    let manager = MockManager::new()
        .with_room("room1")
        .emitting_on_close(candidate_event("candidate:closing"));
    let worker = test_worker(&manager);
    let peer = TestPeer::new("peerA", "room1");
    join_peer(&manager, &worker, &peer).await;

    peer.send(&manager, &peer.kill()).await;

    wait_until("channel removed", || !worker.is_channel_active("peerA")).await;
    assert_eq!(manager.closed_connections(), vec!["peerA"]);
    assert!(peer.next_reply(&manager).await.is_none());
    assert_eq!(peer.pending_replies(&manager).await, 0);
}

#[tokio::test]
async fn test_channel_recovers_from_pop_errors() {
    let peer = TestPeer::new("peerA", "room1");
    let flaky = Arc::new(FlakyQueue::new(&peer.topics.to_peer(&peer.pid), 3));
    let manager = MockManager::new()
        .with_room("room1")
        .with_queue(flaky.clone());
    let worker = test_worker(&manager);
    let engine = join_peer(&manager, &worker, &peer).await;

    peer.send(&manager, &peer.trickle("candidate:0", TrickleTarget::Subscriber))
        .await;

    wait_until("trickle after pop errors", || engine.trickle_calls().len() == 1).await;
    assert!(flaky.pop_attempts() >= 4);
    assert!(worker.is_channel_active("peerA"));
    assert_eq!(peer.pending_replies(&manager).await, 0);
}

#[tokio::test]
async fn test_client_answer_sets_remote_description_without_reply() {
    let manager = MockManager::new().with_room("room1");
    let worker = test_worker(&manager);
    let peer = TestPeer::new("peerA", "room1");
    let engine = join_peer(&manager, &worker, &peer).await;

    peer.send(&manager, &peer.answer("r2", "v=0 answer")).await;

    wait_until("remote description set", || {
        engine.remote_description_calls().len() == 1
    })
    .await;
    let desc = engine.remote_description_calls().pop().unwrap();
    assert_eq!(desc.sdp_type, SdpType::Answer);
    assert!(engine.answer_calls().is_empty());
    assert_eq!(peer.pending_replies(&manager).await, 0);
}

#[tokio::test]
async fn test_rejected_offer_is_dropped() {
    let manager = MockManager::new().with_room("room1").rejecting_offers();
    let worker = test_worker(&manager);
    let peer = TestPeer::new("peerA", "room1");
    let engine = join_peer(&manager, &worker, &peer).await;

    peer.send(&manager, &peer.offer("r2", "v=0 renegotiate")).await;

    wait_until("offer validated", || manager.validation_calls().len() == 1).await;
    assert_eq!(
        manager.validation_calls(),
        vec![("room1".to_string(), "peerA".to_string())]
    );
    assert!(engine.answer_calls().is_empty());
    assert!(peer.next_reply(&manager).await.is_none());
    assert!(worker.is_channel_active("peerA"), "channel stays active");
}

#[tokio::test]
async fn test_accepted_offer_is_answered_with_request_id() {
    let manager = MockManager::new().with_room("room1");
    let worker = test_worker(&manager);
    let peer = TestPeer::new("peerA", "room1");
    let engine = join_peer(&manager, &worker, &peer).await;

    peer.send(&manager, &peer.offer("req-42", "v=0 renegotiate")).await;

    let reply = peer.next_reply(&manager).await.expect("description reply");
    assert_eq!(reply.id, "peerA");
    assert_eq!(reply.request_id.as_deref(), Some("req-42"));
    let SignalReplyPayload::Description(text) = reply.payload else {
        panic!("expected description reply");
    };
    let answer: SessionDescription = serde_json::from_str(&text).unwrap();
    assert_eq!(answer.sdp_type, SdpType::Answer);

    assert_eq!(
        engine.answer_calls(),
        vec![SessionDescription::offer("v=0 renegotiate")]
    );
    assert_eq!(peer.pending_replies(&manager).await, 0);
}

#[tokio::test]
async fn test_offer_for_unknown_room_is_dropped() {
    // Join succeeds without room data; only offers consult it.
    let manager = MockManager::new();
    let worker = test_worker(&manager);
    let peer = TestPeer::new("peerA", "room-gone");
    let engine = join_peer(&manager, &worker, &peer).await;

    peer.send(&manager, &peer.offer("r2", "v=0")).await;
    peer.send(&manager, &peer.trickle("candidate:after", TrickleTarget::Publisher))
        .await;

    wait_until("trickle after offer", || engine.trickle_calls().len() == 1).await;
    assert!(manager.validation_calls().is_empty());
    assert!(engine.answer_calls().is_empty());
    assert_eq!(peer.pending_replies(&manager).await, 0);
}

#[tokio::test]
async fn test_malformed_messages_never_stop_the_channel() {
    let manager = MockManager::new().with_room("room1");
    let worker = test_worker(&manager);
    let peer = TestPeer::new("peerA", "room1");
    let engine = join_peer(&manager, &worker, &peer).await;

    // Undecodable entry
    peer.send_raw(&manager, b"\x00garbage").await;
    // Description whose text is not a negotiation
    let mut bad_description = peer.answer("r", "v=0");
    if let signal_router::protocol::Command::Signal(signal) = &mut bad_description.command {
        signal.payload = signal_router::protocol::SignalPayload::Description("{".to_string());
    }
    peer.send(&manager, &bad_description).await;
    // Trickle whose init is not a candidate
    let mut bad_trickle = peer.trickle("c", TrickleTarget::Publisher);
    if let signal_router::protocol::Command::Signal(signal) = &mut bad_trickle.command {
        if let signal_router::protocol::SignalPayload::Trickle(trickle) = &mut signal.payload {
            trickle.init = "not-json".to_string();
        }
    }
    peer.send(&manager, &bad_trickle).await;
    // Join and room admin on a peer topic
    peer.send(&manager, &peer.join("r-again")).await;
    peer.send(&manager, &open_room("room1", RoomOptions::default()))
        .await;
    // Pranswer is not acted on
    peer.send(
        &manager,
        &peer.description(
            "r",
            SessionDescription {
                sdp_type: SdpType::Pranswer,
                sdp: "v=0".to_string(),
            },
        ),
    )
    .await;
    // Sentinel
    peer.send(&manager, &peer.trickle("candidate:ok", TrickleTarget::Subscriber))
        .await;

    wait_until("sentinel trickle", || engine.trickle_calls().len() == 1).await;
    assert_eq!(
        engine.trickle_calls().pop().unwrap().0.candidate,
        "candidate:ok"
    );
    assert!(worker.is_channel_active("peerA"));
    assert_eq!(peer.pending_replies(&manager).await, 0);
    assert_eq!(manager.created_connections(), vec!["peerA"]);
    assert!(manager.opened_rooms().is_empty());
    assert!(engine.remote_description_calls().is_empty());
}

#[tokio::test]
async fn test_engine_offer_is_forwarded_without_request_id() {
    let manager = MockManager::new().with_room("room1");
    let worker = test_worker(&manager);
    let peer = TestPeer::new("peerA", "room1");
    let engine = join_peer(&manager, &worker, &peer).await;

    assert!(engine.emit(offer_event("v=0 engine")));

    let reply = peer.next_reply(&manager).await.expect("description reply");
    assert!(reply.request_id.is_none());
    let SignalReplyPayload::Description(text) = reply.payload else {
        panic!("expected description reply");
    };
    let offer: SessionDescription = serde_json::from_str(&text).unwrap();
    assert_eq!(offer, SessionDescription::offer("v=0 engine"));
}

#[tokio::test]
async fn test_engine_state_change_is_not_forwarded() {
    let manager = MockManager::new().with_room("room1");
    let worker = test_worker(&manager);
    let peer = TestPeer::new("peerA", "room1");
    let engine = join_peer(&manager, &worker, &peer).await;

    engine.emit(EngineEvent::IceConnectionStateChange(
        IceConnectionState::Connected,
    ));
    engine.emit(candidate_event("candidate:after-state"));

    let reply = peer.next_reply(&manager).await.expect("trickle reply");
    assert!(matches!(reply.payload, SignalReplyPayload::Trickle(_)));
    assert_eq!(peer.pending_replies(&manager).await, 0);
}
