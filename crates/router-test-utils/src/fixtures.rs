//! Request builders and reply readers for tests.

use crate::mock_engine::MockEngine;
use crate::mock_manager::MockManager;
use signal_router::manager::Manager;
use signal_router::protocol::{
    actions, decode_reply, encode_request, IceCandidateInit, Negotiation, Request,
    RoomAdminPayload, RoomAdminRequest, RoomOptions, SessionDescription, SignalPayload,
    SignalReply, SignalReplyPayload, SignalRequest, Topics, Trickle, TrickleTarget,
};
use signal_router::queue::enqueue_request;
use signal_router::Worker;
use std::sync::Arc;
use std::time::Duration;

/// Node id used by [`test_worker`].
pub const TEST_NODE_ID: &str = "node-test";

/// SDP offer text used by join fixtures.
pub const TEST_OFFER_SDP: &str = "v=0\r\no=client 0 0 IN IP4 127.0.0.1\r\n";

/// How long reply readers wait before concluding nothing was enqueued.
pub const REPLY_WAIT: Duration = Duration::from_millis(200);

/// Worker bound to `manager` with the default namespace and a short retry delay.
pub fn test_worker(manager: &MockManager) -> Worker {
    Worker::new(
        TEST_NODE_ID,
        Arc::new(manager.clone()),
        Topics::default(),
        Duration::from_millis(10),
    )
}

/// One client connection: builds its requests and reads its replies.
#[derive(Debug, Clone)]
pub struct TestPeer {
    pub pid: String,
    pub sid: String,
    pub topics: Topics,
}

impl TestPeer {
    pub fn new(pid: &str, sid: &str) -> Self {
        Self {
            pid: pid.to_string(),
            sid: sid.to_string(),
            topics: Topics::default(),
        }
    }

    fn signal(&self, action: &str, request_id: &str, payload: SignalPayload) -> Request {
        Request::signal(
            action,
            SignalRequest {
                id: self.pid.clone(),
                request_id: request_id.to_string(),
                payload,
            },
        )
    }

    pub fn join(&self, request_id: &str) -> Request {
        Request::join(&self.pid, request_id, &self.sid, TEST_OFFER_SDP)
    }

    /// Renegotiation offer from the client.
    pub fn offer(&self, request_id: &str, sdp: &str) -> Request {
        self.description(request_id, SessionDescription::offer(sdp))
    }

    /// Client answer to an engine-initiated offer.
    pub fn answer(&self, request_id: &str, sdp: &str) -> Request {
        self.description(request_id, SessionDescription::answer(sdp))
    }

    pub fn description(&self, request_id: &str, desc: SessionDescription) -> Request {
        let text = serde_json::to_string(&Negotiation { desc }).unwrap();
        self.signal(
            actions::SIGNAL_DESCRIPTION,
            request_id,
            SignalPayload::Description(text),
        )
    }

    pub fn trickle(&self, candidate: &str, target: TrickleTarget) -> Request {
        let init = serde_json::to_string(&IceCandidateInit::new(candidate)).unwrap();
        self.signal(
            actions::SIGNAL_TRICKLE,
            "",
            SignalPayload::Trickle(Trickle { init, target }),
        )
    }

    pub fn kill(&self) -> Request {
        self.signal(actions::SIGNAL_KILL, "", SignalPayload::Kill)
    }

    /// Push `request` onto this peer's inbound topic.
    pub async fn send(&self, manager: &MockManager, request: &Request) {
        let queue = manager.get_queue(&self.topics.to_peer(&self.pid));
        enqueue_request(queue.as_ref(), request).await.unwrap();
    }

    /// Push raw bytes onto this peer's inbound topic.
    pub async fn send_raw(&self, manager: &MockManager, bytes: &[u8]) {
        let queue = manager.get_queue(&self.topics.to_peer(&self.pid));
        queue.enqueue(bytes).await.unwrap();
    }

    /// Next reply on this peer's outbound topic, or `None` after [`REPLY_WAIT`].
    pub async fn next_reply(&self, manager: &MockManager) -> Option<SignalReply> {
        let queue = manager.get_queue(&self.topics.from_peer(&self.pid));
        match queue.block_until_next(REPLY_WAIT).await {
            Ok(bytes) => Some(decode_reply(&bytes).unwrap().as_signal().clone()),
            Err(_) => None,
        }
    }

    /// Number of replies waiting on this peer's outbound topic.
    pub async fn pending_replies(&self, manager: &MockManager) -> usize {
        manager
            .queues()
            .get(&self.topics.from_peer(&self.pid))
            .len()
            .await
    }
}

/// Run `peer`'s join through `worker`, consume the join reply and return
/// the engine the manager created for it.
pub async fn join_peer(manager: &MockManager, worker: &Worker, peer: &TestPeer) -> MockEngine {
    worker.handle(&peer.join("join-1")).await.unwrap();
    let reply = peer
        .next_reply(manager)
        .await
        .expect("join should produce a reply");
    assert!(
        matches!(reply.payload, SignalReplyPayload::Join(_)),
        "first reply should be the join answer, got {reply:?}"
    );
    manager
        .engine(&peer.pid)
        .expect("manager should have created an engine")
}

/// Open-room request for `room_id`.
pub fn open_room(room_id: &str, options: RoomOptions) -> Request {
    Request::room_admin(
        actions::ROOMADMIN_OPENROOM,
        RoomAdminRequest {
            room_id: room_id.to_string(),
            payload: RoomAdminPayload::OpenRoom(options),
        },
    )
}

/// Encoded request bytes, for pushing directly onto a queue.
pub fn encoded(request: &Request) -> Vec<u8> {
    encode_request(request).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use signal_router::protocol::decode_request;

    #[test]
    fn test_peer_builders_address_the_peer() {
        let peer = TestPeer::new("peerA", "room1");

        for request in [
            peer.join("r1"),
            peer.offer("r2", "v=0"),
            peer.trickle("c", TrickleTarget::Subscriber),
            peer.kill(),
        ] {
            assert_eq!(request.as_signal().unwrap().id, "peerA");
            assert_eq!(decode_request(&encoded(&request)).unwrap(), request);
        }
    }

    #[test]
    fn test_open_room_action() {
        let request = open_room("room1", RoomOptions::default());
        assert_eq!(request.action, actions::ROOMADMIN_OPENROOM);
    }
}
