//! Message and protocol types exchanged over queues.
//!
//! - [`envelope`] - request/reply envelopes and their payload sum types
//! - [`session`] - SDP and ICE shapes shared with the media engine
//! - [`topics`] - queue topic naming
//! - [`codec`] - JSON encoding of queue entries

pub mod codec;
pub mod envelope;
pub mod session;
pub mod topics;

pub use codec::{decode_reply, decode_request, encode_reply, encode_request};
pub use envelope::{
    actions, Command, JoinReply, JoinRequest, Reply, ReplyCommand, Request, RoomAdminPayload,
    RoomAdminRequest, RoomOptions, SignalPayload, SignalReply, SignalReplyPayload, SignalRequest,
    Trickle,
};
pub use session::{
    IceCandidateInit, IceConnectionState, Negotiation, SdpType, SessionDescription, TrickleTarget,
};
pub use topics::Topics;
