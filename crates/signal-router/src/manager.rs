//! Session manager interface.
//!
//! The manager sits beside the router: it creates and tears down engine
//! connections, owns room state and admission, and resolves queues by topic.

use crate::engine::EngineConnection;
use crate::errors::RouterError;
use crate::protocol::{RoomAdminRequest, RoomOptions, SessionDescription, SignalRequest};
use crate::queue::Queue;
use async_trait::async_trait;
use std::sync::Arc;

/// Snapshot of a room used to validate offers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomData {
    pub room_id: String,
    pub options: RoomOptions,
    /// Connections currently in the room.
    pub peer_ids: Vec<String>,
}

#[async_trait]
pub trait Manager: Send + Sync {
    /// Create the engine connection object for a join request.
    async fn create_connection(
        &self,
        signal: &SignalRequest,
    ) -> Result<Arc<dyn EngineConnection>, RouterError>;

    /// Tear down the connection for `pid`.
    async fn close_connection(&self, pid: &str);

    async fn open_room(&self, request: &RoomAdminRequest) -> Result<(), RouterError>;

    /// Queue for `topic`. Every call for the same topic addresses the same queue.
    fn get_queue(&self, topic: &str) -> Arc<dyn Queue>;

    async fn get_room_data(&self, sid: &str) -> Result<RoomData, RouterError>;

    /// Admission check for a renegotiation offer from `pid`.
    async fn validate_offer(
        &self,
        room: &RoomData,
        pid: &str,
        offer: &SessionDescription,
    ) -> Result<(), RouterError>;
}
