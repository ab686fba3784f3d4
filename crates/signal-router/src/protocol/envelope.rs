//! Request and reply envelopes moved over queues.
//!
//! Every envelope carries exactly one payload variant; the sum types below
//! make that structural. Routing uses the dotted `action` string on requests.

use super::session::{SessionDescription, TrickleTarget};
use serde::{Deserialize, Serialize};

/// Action strings understood by the worker.
pub mod actions {
    /// Prefix routed to signal handling.
    pub const SIGNAL_PREFIX: &str = "request.signal.";
    /// Prefix routed to room-admin handling.
    pub const ROOMADMIN_PREFIX: &str = "request.roomadmin.";

    pub const SIGNAL_JOIN: &str = "request.signal.join";
    pub const SIGNAL_DESCRIPTION: &str = "request.signal.description";
    pub const SIGNAL_TRICKLE: &str = "request.signal.trickle";
    pub const SIGNAL_KILL: &str = "request.signal.kill";

    pub const ROOMADMIN_OPENROOM: &str = "request.roomadmin.openroom";
    pub const ROOMADMIN_CLOSEROOM: &str = "request.roomadmin.closeroom";
}

/// Inbound request envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub action: String,
    pub command: Command,
}

/// Request payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Signal(SignalRequest),
    RoomAdmin(RoomAdminRequest),
}

impl Request {
    /// Build a signal request envelope.
    #[must_use]
    pub fn signal(action: impl Into<String>, signal: SignalRequest) -> Self {
        Self {
            action: action.into(),
            command: Command::Signal(signal),
        }
    }

    /// Build a room-admin request envelope.
    #[must_use]
    pub fn room_admin(action: impl Into<String>, admin: RoomAdminRequest) -> Self {
        Self {
            action: action.into(),
            command: Command::RoomAdmin(admin),
        }
    }

    /// Join request for `pid` into room `sid` with the client's SDP offer.
    #[must_use]
    pub fn join(
        pid: impl Into<String>,
        request_id: impl Into<String>,
        sid: impl Into<String>,
        offer_sdp: impl Into<String>,
    ) -> Self {
        Self::signal(
            actions::SIGNAL_JOIN,
            SignalRequest {
                id: pid.into(),
                request_id: request_id.into(),
                payload: SignalPayload::Join(JoinRequest {
                    sid: sid.into(),
                    description: offer_sdp.into(),
                }),
            },
        )
    }

    /// The signal payload, if this is a signal request.
    #[must_use]
    pub fn as_signal(&self) -> Option<&SignalRequest> {
        match &self.command {
            Command::Signal(signal) => Some(signal),
            Command::RoomAdmin(_) => None,
        }
    }
}

/// Signaling request addressed to one connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRequest {
    /// Connection identity (pid).
    pub id: String,
    /// Client correlation id, echoed on request/response replies.
    #[serde(default)]
    pub request_id: String,
    pub payload: SignalPayload,
}

/// Signal request payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalPayload {
    Join(JoinRequest),
    /// JSON text of a `Negotiation`.
    Description(String),
    Trickle(Trickle),
    Kill,
}

impl SignalPayload {
    /// Bounded label for logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            SignalPayload::Join(_) => "join",
            SignalPayload::Description(_) => "description",
            SignalPayload::Trickle(_) => "trickle",
            SignalPayload::Kill => "kill",
        }
    }
}

/// Join payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    /// Room identity.
    pub sid: String,
    /// Raw SDP offer text.
    pub description: String,
}

/// ICE candidate trickle, used in both directions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trickle {
    /// JSON text of an `IceCandidateInit`.
    pub init: String,
    pub target: TrickleTarget,
}

/// Room administration request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomAdminRequest {
    pub room_id: String,
    pub payload: RoomAdminPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomAdminPayload {
    OpenRoom(RoomOptions),
    CloseRoom,
}

/// Options a room is opened with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomOptions {
    pub title: Option<String>,
    pub max_peers: Option<u32>,
    /// Broadcast-style room where only the owner publishes.
    pub is_channel: bool,
}

/// Outbound reply envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub command: ReplyCommand,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyCommand {
    Signal(SignalReply),
}

impl Reply {
    #[must_use]
    pub fn signal(reply: SignalReply) -> Self {
        Self {
            command: ReplyCommand::Signal(reply),
        }
    }

    /// The signal reply carried by this envelope.
    #[must_use]
    pub fn as_signal(&self) -> &SignalReply {
        match &self.command {
            ReplyCommand::Signal(signal) => signal,
        }
    }
}

/// Signaling reply for one connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalReply {
    /// Connection identity (pid).
    pub id: String,
    /// Echo of the triggering request; `None` for engine-initiated replies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub payload: SignalReplyPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalReplyPayload {
    Join(JoinReply),
    /// JSON text of a `SessionDescription`.
    Description(String),
    Trickle(Trickle),
}

impl SignalReplyPayload {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            SignalReplyPayload::Join(_) => "join",
            SignalReplyPayload::Description(_) => "description",
            SignalReplyPayload::Trickle(_) => "trickle",
        }
    }
}

/// Answer to a join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinReply {
    /// JSON text of the answer `SessionDescription`.
    pub description: String,
}

impl SignalReply {
    /// Join answer correlated to `request_id`.
    pub fn join_answer(
        pid: impl Into<String>,
        request_id: impl Into<String>,
        answer: &SessionDescription,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: pid.into(),
            request_id: Some(request_id.into()),
            payload: SignalReplyPayload::Join(JoinReply {
                description: serde_json::to_string(answer)?,
            }),
        })
    }

    /// Description reply. `request_id` is `None` when the engine initiated it.
    pub fn description(
        pid: impl Into<String>,
        request_id: Option<String>,
        desc: &SessionDescription,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: pid.into(),
            request_id,
            payload: SignalReplyPayload::Description(serde_json::to_string(desc)?),
        })
    }

    /// Engine-produced ICE candidate for the client.
    pub fn trickle(
        pid: impl Into<String>,
        candidate: &super::IceCandidateInit,
        target: TrickleTarget,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: pid.into(),
            request_id: None,
            payload: SignalReplyPayload::Trickle(Trickle {
                init: serde_json::to_string(candidate)?,
                target,
            }),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::protocol::IceCandidateInit;

    #[test]
    fn test_join_request_shape() {
        let request = Request::join("peerA", "req-1", "room1", "v=0");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["action"], "request.signal.join");
        assert_eq!(json["command"]["signal"]["id"], "peerA");
        assert_eq!(json["command"]["signal"]["request_id"], "req-1");
        assert_eq!(
            json["command"]["signal"]["payload"]["join"]["sid"],
            "room1"
        );
    }

    #[test]
    fn test_kill_payload_is_a_bare_tag() {
        let request = Request::signal(
            actions::SIGNAL_KILL,
            SignalRequest {
                id: "peerA".to_string(),
                request_id: String::new(),
                payload: SignalPayload::Kill,
            },
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["command"]["signal"]["payload"], "kill");
    }

    #[test]
    fn test_request_id_defaults_to_empty() {
        let raw = r#"{"action":"request.signal.kill","command":{"signal":{"id":"p","payload":"kill"}}}"#;
        let request: Request = serde_json::from_str(raw).unwrap();
        assert_eq!(request.as_signal().unwrap().request_id, "");
    }

    #[test]
    fn test_two_payload_variants_are_rejected() {
        let raw = r#"{"action":"request.signal.trickle","command":{"signal":{"id":"p","payload":{"kill":null,"trickle":{"init":"{}","target":"publisher"}}}}}"#;
        assert!(serde_json::from_str::<Request>(raw).is_err());
    }

    #[test]
    fn test_engine_initiated_reply_omits_request_id() {
        let reply = SignalReply::description("peerA", None, &SessionDescription::offer("v=0"))
            .unwrap();
        let json = serde_json::to_value(Reply::signal(reply)).unwrap();
        assert!(json["command"]["signal"].get("request_id").is_none());
    }

    #[test]
    fn test_join_answer_embeds_session_description() {
        let reply =
            SignalReply::join_answer("peerA", "req-9", &SessionDescription::answer("v=0")).unwrap();
        assert_eq!(reply.request_id.as_deref(), Some("req-9"));
        let SignalReplyPayload::Join(join) = &reply.payload else {
            panic!("expected join payload");
        };
        let desc: SessionDescription = serde_json::from_str(&join.description).unwrap();
        assert_eq!(desc, SessionDescription::answer("v=0"));
    }

    #[test]
    fn test_trickle_reply_carries_target() {
        let reply =
            SignalReply::trickle("peerA", &IceCandidateInit::new("c"), TrickleTarget::Subscriber)
                .unwrap();
        assert_eq!(reply.payload.kind(), "trickle");
        let SignalReplyPayload::Trickle(trickle) = reply.payload else {
            panic!("expected trickle payload");
        };
        assert_eq!(trickle.target, TrickleTarget::Subscriber);
        assert_eq!(trickle.init, r#"{"candidate":"c"}"#);
    }

    #[test]
    fn test_room_options_default_when_missing() {
        let raw = r#"{"room_id":"room1","payload":{"open_room":{}}}"#;
        let admin: RoomAdminRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(admin.payload, RoomAdminPayload::OpenRoom(RoomOptions::default()));
    }
}
