//! SDP and ICE shapes exchanged with the media engine.
//!
//! Field names follow the browser/W3C JSON form so that payloads produced by
//! clients and engines pass through unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;

/// SDP message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Pranswer,
    Answer,
    Rollback,
}

impl SdpType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            SdpType::Offer => "offer",
            SdpType::Pranswer => "pranswer",
            SdpType::Answer => "answer",
            SdpType::Rollback => "rollback",
        }
    }
}

impl fmt::Display for SdpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A session description (offer or answer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    #[must_use]
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    #[must_use]
    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// Renegotiation message carried inside a `Description` signal payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Negotiation {
    pub desc: SessionDescription,
}

/// ICE candidate in its JSON init form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidateInit {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_m_line_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

impl IceCandidateInit {
    #[must_use]
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_m_line_index: None,
            username_fragment: None,
        }
    }
}

/// Which of the connection's two transports a candidate belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrickleTarget {
    Publisher,
    Subscriber,
}

impl TrickleTarget {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            TrickleTarget::Publisher => "publisher",
            TrickleTarget::Subscriber => "subscriber",
        }
    }
}

/// ICE connection state reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IceConnectionState {
    New,
    Checking,
    Connected,
    Completed,
    Disconnected,
    Failed,
    Closed,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_session_description_uses_type_field() {
        let desc = SessionDescription::answer("v=0");
        let json = serde_json::to_string(&desc).unwrap();
        assert_eq!(json, r#"{"type":"answer","sdp":"v=0"}"#);
    }

    #[test]
    fn test_trickle_target_wire_form_matches_label() {
        for target in [TrickleTarget::Publisher, TrickleTarget::Subscriber] {
            let json = serde_json::to_string(&target).unwrap();
            assert_eq!(json, format!("\"{}\"", target.as_str()));
            assert_eq!(serde_json::from_str::<TrickleTarget>(&json).unwrap(), target);
        }
        assert!(serde_json::from_str::<TrickleTarget>("0").is_err());
    }

    #[test]
    fn test_negotiation_from_browser_json() {
        let raw = r#"{"desc":{"type":"offer","sdp":"v=0\r\n"}}"#;
        let negotiation: Negotiation = serde_json::from_str(raw).unwrap();
        assert_eq!(negotiation.desc.sdp_type, SdpType::Offer);
        assert_eq!(negotiation.desc.sdp, "v=0\r\n");
    }

    #[test]
    fn test_unknown_sdp_type_is_rejected() {
        let raw = r#"{"desc":{"type":"bogus","sdp":""}}"#;
        assert!(serde_json::from_str::<Negotiation>(raw).is_err());
    }

    #[test]
    fn test_ice_candidate_camel_case_fields() {
        let raw = r#"{"candidate":"candidate:1 1 udp 2122260223 10.0.0.1 49152 typ host","sdpMid":"0","sdpMLineIndex":0}"#;
        let candidate: IceCandidateInit = serde_json::from_str(raw).unwrap();
        assert_eq!(candidate.sdp_mid.as_deref(), Some("0"));
        assert_eq!(candidate.sdp_m_line_index, Some(0));
        assert!(candidate.username_fragment.is_none());

        let json = serde_json::to_string(&IceCandidateInit::new("c")).unwrap();
        assert_eq!(json, r#"{"candidate":"c"}"#);
    }
}
