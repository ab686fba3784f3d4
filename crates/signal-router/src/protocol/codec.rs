//! JSON codec for queue entries.

use super::envelope::{Reply, Request};
use crate::errors::RouterError;

pub fn encode_request(request: &Request) -> Result<Vec<u8>, RouterError> {
    serde_json::to_vec(request).map_err(|e| RouterError::Encode(format!("request: {e}")))
}

pub fn decode_request(bytes: &[u8]) -> Result<Request, RouterError> {
    serde_json::from_slice(bytes).map_err(|e| RouterError::Decode(format!("request: {e}")))
}

pub fn encode_reply(reply: &Reply) -> Result<Vec<u8>, RouterError> {
    serde_json::to_vec(reply).map_err(|e| RouterError::Encode(format!("reply: {e}")))
}

pub fn decode_reply(bytes: &[u8]) -> Result<Reply, RouterError> {
    serde_json::from_slice(bytes).map_err(|e| RouterError::Decode(format!("reply: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::protocol::{Request, SignalPayload};

    #[test]
    fn test_decode_request_from_wire() {
        let wire = br#"{"action":"request.signal.join","command":{"signal":{"id":"peerA","request_id":"r1","payload":{"join":{"sid":"room1","description":"v=0"}}}}}"#;
        let request = decode_request(wire).unwrap();
        assert_eq!(request, Request::join("peerA", "r1", "room1", "v=0"));
    }

    #[test]
    fn test_decode_garbage_is_decode_error() {
        let err = decode_request(b"\x00\x01not-json").unwrap_err();
        assert!(matches!(err, RouterError::Decode(msg) if msg.starts_with("request:")));
    }

    #[test]
    fn test_unknown_payload_variant_is_decode_error() {
        let wire = br#"{"action":"request.signal.play","command":{"signal":{"id":"p","payload":{"play":{}}}}}"#;
        assert!(matches!(decode_request(wire), Err(RouterError::Decode(_))));
    }

    #[test]
    fn test_encode_request_is_decodable() {
        let request = Request::join("peerB", "r2", "room2", "v=0");
        let bytes = encode_request(&request).unwrap();
        let decoded = decode_request(&bytes).unwrap();
        assert!(matches!(
            decoded.as_signal().map(|s| &s.payload),
            Some(SignalPayload::Join(_))
        ));
    }
}
