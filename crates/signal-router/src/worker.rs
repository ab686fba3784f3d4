//! `Worker` - a node's command dispatch loop.
//!
//! The worker consumes `{ns}worker/{node_id}`, routes each request by action
//! prefix, and runs the join procedure. Once a join succeeds the connection's
//! traffic moves to its peer channel and never passes through the worker again.
//!
//! # Join serialization
//!
//! Joins run one at a time per worker under `join_lock`, held from connection
//! creation until the peer channel is spawned. Other requests are not blocked
//! by it but are handled on the same loop, so a slow engine join delays them.

use crate::config::Config;
use crate::engine::{event_channel, EngineConnection};
use crate::errors::RouterError;
use crate::manager::Manager;
use crate::observability::metrics;
use crate::peer::{spawn_event_forwarder, PeerChannel, PeerRegistry, PeerSession};
use crate::protocol::{
    actions, decode_request, Command, JoinRequest, Reply, Request, SessionDescription,
    SignalPayload, SignalReply, SignalRequest, Topics,
};
use crate::queue::{enqueue_reply, Queue};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

pub struct Worker {
    id: String,
    queue: Arc<dyn Queue>,
    manager: Arc<dyn Manager>,
    topics: Topics,
    retry_delay: Duration,
    join_lock: Mutex<()>,
    registry: Arc<PeerRegistry>,
}

impl Worker {
    /// Create a worker consuming `topics.worker(id)` through `manager`.
    pub fn new(
        id: impl Into<String>,
        manager: Arc<dyn Manager>,
        topics: Topics,
        retry_delay: Duration,
    ) -> Self {
        let id = id.into();
        let queue = manager.get_queue(&topics.worker(&id));
        Self {
            id,
            queue,
            manager,
            topics,
            retry_delay,
            join_lock: Mutex::new(()),
            registry: Arc::new(PeerRegistry::new()),
        }
    }

    pub fn from_config(config: &Config, manager: Arc<dyn Manager>) -> Self {
        Self::new(
            config.node_id.clone(),
            manager,
            config.topics(),
            config.worker_retry_delay,
        )
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The node's inbound command queue.
    #[must_use]
    pub fn queue(&self) -> &Arc<dyn Queue> {
        &self.queue
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<PeerRegistry> {
        &self.registry
    }

    /// Whether `pid` currently has a live peer channel.
    #[must_use]
    pub fn is_channel_active(&self, pid: &str) -> bool {
        self.registry.is_active(pid)
    }

    /// Handle requests until the task is dropped.
    ///
    /// Errors are logged and followed by a fixed retry delay; this never returns.
    #[instrument(skip_all, name = "router.worker", fields(node_id = %self.id))]
    pub async fn handle_forever(&self) {
        info!(
            target: "router.worker",
            node_id = %self.id,
            topic = %self.queue.topic(),
            "Worker started"
        );

        loop {
            if let Err(e) = self.handle_next(Duration::ZERO).await {
                error!(
                    target: "router.worker",
                    node_id = %self.id,
                    error = %e,
                    "Error handling request"
                );
                tokio::time::sleep(self.retry_delay).await;
            }
        }
    }

    /// Wait for the next request and handle it.
    pub async fn handle_next(&self, timeout: Duration) -> Result<(), RouterError> {
        let request = self.next_command(timeout).await?;
        self.handle(&request).await
    }

    /// Pop and decode the next request from the node topic.
    ///
    /// `Duration::ZERO` waits indefinitely.
    pub async fn next_command(&self, timeout: Duration) -> Result<Request, RouterError> {
        let bytes = self.queue.block_until_next(timeout).await.map_err(|e| {
            if matches!(e, RouterError::Queue { .. }) {
                metrics::record_queue_error("worker_pop");
            }
            e
        })?;

        decode_request(&bytes).map_err(|e| {
            metrics::record_message_dropped(e.kind());
            e
        })
    }

    /// Route a request by action prefix. Unknown prefixes are ignored.
    pub async fn handle(&self, request: &Request) -> Result<(), RouterError> {
        if request.action.starts_with(actions::SIGNAL_PREFIX) {
            metrics::record_request("signal");
            self.handle_signal(request).await
        } else if request.action.starts_with(actions::ROOMADMIN_PREFIX) {
            metrics::record_request("room_admin");
            self.handle_room_admin(request).await
        } else {
            debug!(
                target: "router.worker",
                action = %request.action,
                "Ignoring request with unknown action"
            );
            metrics::record_request("ignored");
            Ok(())
        }
    }

    /// Room administration. Only open-room is acted upon.
    pub async fn handle_room_admin(&self, request: &Request) -> Result<(), RouterError> {
        if request.action != actions::ROOMADMIN_OPENROOM {
            debug!(
                target: "router.worker",
                action = %request.action,
                "Ignoring room admin action"
            );
            return Ok(());
        }

        match &request.command {
            Command::RoomAdmin(admin) => {
                info!(target: "router.worker", room_id = %admin.room_id, "Opening room");
                self.manager.open_room(admin).await
            }
            Command::Signal(_) => Err(RouterError::InvalidRequest(format!(
                "{} without room admin command",
                request.action
            ))),
        }
    }

    /// Signal requests. Only join is handled here; everything else travels
    /// on peer topics.
    pub async fn handle_signal(&self, request: &Request) -> Result<(), RouterError> {
        if request.action != actions::SIGNAL_JOIN {
            debug!(
                target: "router.worker",
                action = %request.action,
                "Ignoring signal action on worker topic"
            );
            return Ok(());
        }

        let signal = request.as_signal().ok_or_else(|| {
            RouterError::InvalidRequest(format!("{} without signal command", request.action))
        })?;
        self.handle_join(signal).await
    }

    /// Join `signal.id` into the requested room.
    ///
    /// On success exactly one join reply carrying `request_id` is enqueued on
    /// the connection's outbound topic and a peer channel is started. On
    /// failure nothing is enqueued.
    #[instrument(skip_all, name = "router.worker.join", fields(pid = %signal.id))]
    pub async fn handle_join(&self, signal: &SignalRequest) -> Result<(), RouterError> {
        let SignalPayload::Join(join) = &signal.payload else {
            return Err(RouterError::InvalidRequest(format!(
                "join action with {} payload",
                signal.payload.kind()
            )));
        };

        let _guard = self.join_lock.lock().await;
        let started = Instant::now();

        let result = self.join_locked(signal, join).await;

        match &result {
            Ok(()) => {
                metrics::record_join("success", started.elapsed());
                info!(
                    target: "router.worker",
                    pid = %signal.id,
                    sid = %join.sid,
                    "Peer joined"
                );
            }
            Err(e) => {
                metrics::record_join(e.kind(), started.elapsed());
                warn!(
                    target: "router.worker",
                    pid = %signal.id,
                    sid = %join.sid,
                    error = %e,
                    "Join failed"
                );
            }
        }
        result
    }

    async fn join_locked(
        &self,
        signal: &SignalRequest,
        join: &JoinRequest,
    ) -> Result<(), RouterError> {
        let pid = signal.id.as_str();

        let engine = self.manager.create_connection(signal).await?;

        // Sink goes in before negotiation so early candidates are buffered.
        let (events_tx, events_rx) = event_channel();
        engine.set_event_sink(events_tx);

        let inbound = self.manager.get_queue(&self.topics.to_peer(pid));
        let outbound = self.manager.get_queue(&self.topics.from_peer(pid));

        if let Err(e) = self
            .negotiate(signal, join, engine.as_ref(), outbound.as_ref())
            .await
        {
            self.manager.close_connection(pid).await;
            return Err(e);
        }

        let registration = self.registry.register(pid);
        spawn_event_forwarder(
            pid.to_string(),
            events_rx,
            Arc::clone(&outbound),
            registration.cancel_token.clone(),
        );
        let (channel, _task) = PeerChannel::spawn(
            PeerSession {
                pid: pid.to_string(),
                sid: join.sid.clone(),
                engine,
                inbound,
                outbound,
            },
            Arc::clone(&self.manager),
            Arc::clone(&self.registry),
            registration.generation,
            registration.cancel_token,
        );
        debug!(
            target: "router.worker",
            pid = %channel.pid(),
            generation = channel.generation(),
            replaced = registration.replaced,
            "Peer channel spawned"
        );

        Ok(())
    }

    /// Run the engine join and enqueue its answer.
    async fn negotiate(
        &self,
        signal: &SignalRequest,
        join: &JoinRequest,
        engine: &dyn EngineConnection,
        outbound: &dyn Queue,
    ) -> Result<(), RouterError> {
        let offer = SessionDescription::offer(join.description.clone());
        let answer = engine.join(&join.sid, offer).await?;

        let reply =
            SignalReply::join_answer(signal.id.clone(), signal.request_id.clone(), &answer)
                .map_err(|e| RouterError::Encode(format!("join answer: {e}")))?;
        enqueue_reply(outbound, &Reply::signal(reply)).await
    }
}
