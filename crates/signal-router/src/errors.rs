//! Signal router error types.
//!
//! Nothing in the router is process-fatal. Errors are logged at the loop that
//! observed them and the offending message is dropped; see the worker and
//! peer channel loops for the retry policy at each site.

use thiserror::Error;

/// Signal router error type.
#[derive(Debug, Error)]
pub enum RouterError {
    /// Queue transport failed (push or pop).
    #[error("Queue error on {topic}: {reason}")]
    Queue { topic: String, reason: String },

    /// A bounded `block_until_next` elapsed without a message.
    #[error("Timed out waiting for message on {0}")]
    QueueTimeout(String),

    /// A queue entry or embedded payload could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A reply or embedded payload could not be encoded.
    #[error("Encode error: {0}")]
    Encode(String),

    /// Envelope is well-formed but inconsistent (e.g. join action without a join payload).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Manager refused or failed to create an engine connection object.
    #[error("Connection create failed: {0}")]
    ConnectionCreate(String),

    /// Engine connection reported a negotiation failure.
    #[error("Engine error: {0}")]
    Engine(String),

    /// Room data could not be found for a session.
    #[error("Room not found: {0}")]
    RoomNotFound(String),

    /// Offer failed validation against room data.
    #[error("Offer rejected: {0}")]
    OfferRejected(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RouterError {
    /// Returns a bounded label for metrics and log fields.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            RouterError::Queue { .. } => "queue",
            RouterError::QueueTimeout(_) => "queue_timeout",
            RouterError::Decode(_) => "decode",
            RouterError::Encode(_) => "encode",
            RouterError::InvalidRequest(_) => "invalid_request",
            RouterError::ConnectionCreate(_) => "connection_create",
            RouterError::Engine(_) => "engine",
            RouterError::RoomNotFound(_) => "room_not_found",
            RouterError::OfferRejected(_) => "offer_rejected",
            RouterError::Config(_) => "config",
        }
    }

    /// Shorthand for a queue transport error.
    pub fn queue(topic: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        RouterError::Queue {
            topic: topic.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels() {
        assert_eq!(RouterError::queue("noir/worker/a", "down").kind(), "queue");
        assert_eq!(
            RouterError::QueueTimeout("t".to_string()).kind(),
            "queue_timeout"
        );
        assert_eq!(RouterError::Decode("x".to_string()).kind(), "decode");
        assert_eq!(
            RouterError::ConnectionCreate("x".to_string()).kind(),
            "connection_create"
        );
        assert_eq!(
            RouterError::OfferRejected("x".to_string()).kind(),
            "offer_rejected"
        );
    }

    #[test]
    fn test_display_formatting() {
        assert_eq!(
            RouterError::queue("noir/peer/a/to", "connection reset").to_string(),
            "Queue error on noir/peer/a/to: connection reset"
        );
        assert_eq!(
            RouterError::QueueTimeout("noir/worker/n1".to_string()).to_string(),
            "Timed out waiting for message on noir/worker/n1"
        );
        assert_eq!(
            RouterError::RoomNotFound("room1".to_string()).to_string(),
            "Room not found: room1"
        );
    }
}
