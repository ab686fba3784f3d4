//! Mock session manager.
//!
//! Queues come from a shared `MemoryQueueSet`, so a test can push requests
//! onto any topic and read replies back. Engine connections are `MockEngine`s,
//! retrievable by pid after the worker created them.
//!
//! # Example
//!
//! ```rust,ignore
//! use router_test_utils::{MockEngine, MockManager};
//!
//! let manager = MockManager::new()
//!     .with_room("room1")
//!     .with_next_engine(MockEngine::new().failing_join());
//!
//! // ... run a join through the worker ...
//!
//! assert_eq!(manager.closed_connections(), vec!["peerA"]);
//! ```
//!
//! `with_queue` swaps in any `Queue` for one topic (e.g. a `FlakyQueue`), and
//! `emitting_on_close` makes `close_connection` raise an engine event and then
//! take a while, like a real engine tearing down its transports.

use crate::mock_engine::MockEngine;
use async_trait::async_trait;
use signal_router::engine::{EngineConnection, EngineEvent};
use signal_router::manager::{Manager, RoomData};
use signal_router::protocol::{RoomAdminRequest, SessionDescription, SignalRequest};
use signal_router::queue::{MemoryQueueSet, Queue};
use signal_router::RouterError;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Entry age used by the mock's queues.
pub const MOCK_QUEUE_MAX_AGE: Duration = Duration::from_secs(25);

/// How long `close_connection` takes when an on-close event is configured.
pub const MOCK_CLOSE_DURATION: Duration = Duration::from_millis(50);

#[derive(Clone)]
pub struct MockManager {
    queues: MemoryQueueSet,
    queue_overrides: Arc<Mutex<HashMap<String, Arc<dyn Queue>>>>,
    inner: Arc<Mutex<MockManagerInner>>,
}

impl fmt::Debug for MockManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockManager")
            .field("queues", &self.queues)
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct MockManagerInner {
    rooms: HashMap<String, RoomData>,
    next_engines: VecDeque<MockEngine>,
    engines: HashMap<String, MockEngine>,
    created: Vec<String>,
    closed: Vec<String>,
    opened_rooms: Vec<RoomAdminRequest>,
    validations: Vec<(String, String)>,
    fail_create: bool,
    reject_offers: bool,
    close_event: Option<EngineEvent>,
}

impl Default for MockManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MockManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            queues: MemoryQueueSet::new(MOCK_QUEUE_MAX_AGE),
            queue_overrides: Arc::new(Mutex::new(HashMap::new())),
            inner: Arc::new(Mutex::new(MockManagerInner::default())),
        }
    }

    /// Make room `sid` known to `get_room_data`.
    #[must_use]
    pub fn with_room(self, sid: &str) -> Self {
        self.inner.lock().unwrap().rooms.insert(
            sid.to_string(),
            RoomData {
                room_id: sid.to_string(),
                ..RoomData::default()
            },
        );
        self
    }

    /// Hand out `engine` on the next `create_connection` instead of a default one.
    #[must_use]
    pub fn with_next_engine(self, engine: MockEngine) -> Self {
        self.inner.lock().unwrap().next_engines.push_back(engine);
        self
    }

    /// Fail every `create_connection` with `RouterError::ConnectionCreate`.
    #[must_use]
    pub fn failing_create(self) -> Self {
        self.inner.lock().unwrap().fail_create = true;
        self
    }

    /// Reject every offer with `RouterError::OfferRejected`.
    #[must_use]
    pub fn rejecting_offers(self) -> Self {
        self.inner.lock().unwrap().reject_offers = true;
        self
    }

    /// Serve `queue` from `get_queue` for its topic instead of a memory queue.
    #[must_use]
    pub fn with_queue(self, queue: Arc<dyn Queue>) -> Self {
        self.queue_overrides
            .lock()
            .unwrap()
            .insert(queue.topic().to_string(), queue);
        self
    }

    /// On `close_connection`, emit `event` from the pid's engine, then take
    /// `MOCK_CLOSE_DURATION` before returning.
    #[must_use]
    pub fn emitting_on_close(self, event: EngineEvent) -> Self {
        self.inner.lock().unwrap().close_event = Some(event);
        self
    }

    /// The in-memory queues behind `get_queue`.
    pub fn queues(&self) -> &MemoryQueueSet {
        &self.queues
    }

    /// Most recent engine created for `pid`.
    pub fn engine(&self, pid: &str) -> Option<MockEngine> {
        self.inner.lock().unwrap().engines.get(pid).cloned()
    }

    /// Pids passed to `create_connection`, in call order.
    pub fn created_connections(&self) -> Vec<String> {
        self.inner.lock().unwrap().created.clone()
    }

    /// Pids passed to `close_connection`, in call order.
    pub fn closed_connections(&self) -> Vec<String> {
        self.inner.lock().unwrap().closed.clone()
    }

    pub fn opened_rooms(&self) -> Vec<RoomAdminRequest> {
        self.inner.lock().unwrap().opened_rooms.clone()
    }

    /// `(room_id, pid)` for every `validate_offer` call.
    pub fn validation_calls(&self) -> Vec<(String, String)> {
        self.inner.lock().unwrap().validations.clone()
    }
}

#[async_trait]
impl Manager for MockManager {
    async fn create_connection(
        &self,
        signal: &SignalRequest,
    ) -> Result<Arc<dyn EngineConnection>, RouterError> {
        let mut inner = self.inner.lock().unwrap();
        inner.created.push(signal.id.clone());
        if inner.fail_create {
            return Err(RouterError::ConnectionCreate(
                "mock create failure".to_string(),
            ));
        }
        let engine = inner.next_engines.pop_front().unwrap_or_default();
        inner.engines.insert(signal.id.clone(), engine.clone());
        Ok(Arc::new(engine))
    }

    async fn close_connection(&self, pid: &str) {
        let closing = {
            let mut inner = self.inner.lock().unwrap();
            inner.closed.push(pid.to_string());
            let engine = inner.engines.get(pid).cloned();
            inner.close_event.clone().zip(engine)
        };
        if let Some((event, engine)) = closing {
            engine.emit(event);
            tokio::time::sleep(MOCK_CLOSE_DURATION).await;
        }
    }

    async fn open_room(&self, request: &RoomAdminRequest) -> Result<(), RouterError> {
        let mut inner = self.inner.lock().unwrap();
        inner.opened_rooms.push(request.clone());
        if let signal_router::protocol::RoomAdminPayload::OpenRoom(options) = &request.payload {
            inner.rooms.insert(
                request.room_id.clone(),
                RoomData {
                    room_id: request.room_id.clone(),
                    options: options.clone(),
                    peer_ids: Vec::new(),
                },
            );
        }
        Ok(())
    }

    fn get_queue(&self, topic: &str) -> Arc<dyn Queue> {
        if let Some(queue) = self.queue_overrides.lock().unwrap().get(topic) {
            return Arc::clone(queue);
        }
        self.queues.get(topic)
    }

    async fn get_room_data(&self, sid: &str) -> Result<RoomData, RouterError> {
        self.inner
            .lock()
            .unwrap()
            .rooms
            .get(sid)
            .cloned()
            .ok_or_else(|| RouterError::RoomNotFound(sid.to_string()))
    }

    async fn validate_offer(
        &self,
        room: &RoomData,
        pid: &str,
        _offer: &SessionDescription,
    ) -> Result<(), RouterError> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .validations
            .push((room.room_id.clone(), pid.to_string()));
        if inner.reject_offers {
            return Err(RouterError::OfferRejected(format!(
                "{pid} may not publish in {}",
                room.room_id
            )));
        }
        Ok(())
    }
}
