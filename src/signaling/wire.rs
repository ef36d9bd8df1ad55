//! SDP / ICE-candidate-init wire shape and the WebSocket message envelope.
//!
//! Codec bodies for SDP and ICE candidates are out of scope (§1); this is
//! only the JSON *shape* `on_offer`/`on_answer`/`on_ice_candidate` need to
//! be callable at all, with the exact error taxonomy scenario S5 pins down.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("malformed JSON: {0}")]
    Protocol(String),
    #[error("missing sdp")]
    MissingSdp,
    #[error("missing type")]
    MissingType,
    #[error("invalid type: {0}")]
    InvalidType(String),
    #[error("missing candidate")]
    MissingCandidate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdpType {
    Offer,
    Answer,
}

impl SdpType {
    fn as_str(&self) -> &'static str {
        match self {
            SdpType::Offer => "offer",
            SdpType::Answer => "answer",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    pub sdp_type: SdpType,
    pub sdp: String,
}

/// Parses `{"type":"offer"|"answer","sdp":"<CRLF-lined SDP>"}`, distinguishing
/// the four ways it can be malformed per scenario S5: not JSON at all, an
/// object missing both keys, missing just one, or an unrecognized `type`.
pub fn parse_sdp(raw: &str) -> Result<SessionDescription, WireError> {
    let value: serde_json::Value = serde_json::from_str(raw).map_err(|e| WireError::Protocol(e.to_string()))?;
    let obj = value
        .as_object()
        .ok_or_else(|| WireError::Protocol("expected a JSON object".to_owned()))?;

    let has_type = obj.contains_key("type");
    let has_sdp = obj.contains_key("sdp");
    if !has_type && !has_sdp {
        return Err(WireError::Protocol("empty SDP object".to_owned()));
    }
    if !has_sdp {
        return Err(WireError::MissingSdp);
    }
    if !has_type {
        return Err(WireError::MissingType);
    }

    let type_str = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| WireError::InvalidType("type is not a string".to_owned()))?;
    let sdp_type = match type_str {
        "offer" => SdpType::Offer,
        "answer" => SdpType::Answer,
        other => return Err(WireError::InvalidType(other.to_owned())),
    };
    let sdp = obj
        .get("sdp")
        .and_then(|v| v.as_str())
        .ok_or_else(|| WireError::Protocol("sdp is not a string".to_owned()))?
        .to_owned();

    Ok(SessionDescription { sdp_type, sdp })
}

pub fn serialize_sdp(desc: &SessionDescription) -> String {
    serde_json::json!({
        "type": desc.sdp_type.as_str(),
        "sdp": desc.sdp,
    })
    .to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IceCandidateInit {
    pub candidate: String,
    pub sdp_mid: String,
    pub sdp_mline_index: u16,
}

pub fn parse_ice_candidate_init(raw: &str) -> Result<IceCandidateInit, WireError> {
    let value: serde_json::Value = serde_json::from_str(raw).map_err(|e| WireError::Protocol(e.to_string()))?;
    let obj = value
        .as_object()
        .ok_or_else(|| WireError::Protocol("expected a JSON object".to_owned()))?;
    let candidate = obj
        .get("candidate")
        .and_then(|v| v.as_str())
        .ok_or(WireError::MissingCandidate)?
        .to_owned();
    let sdp_mid = obj.get("sdpMid").and_then(|v| v.as_str()).unwrap_or_default().to_owned();
    let sdp_mline_index = obj.get("sdpMLineIndex").and_then(|v| v.as_u64()).unwrap_or(0) as u16;
    Ok(IceCandidateInit {
        candidate,
        sdp_mid,
        sdp_mline_index,
    })
}

pub fn serialize_ice_candidate_init(c: &IceCandidateInit) -> String {
    serde_json::json!({
        "candidate": c.candidate,
        "sdpMid": c.sdp_mid,
        "sdpMLineIndex": c.sdp_mline_index,
    })
    .to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Offer,
    Answer,
    IceCandidate,
    StatusResponse,
}

/// The WebSocket frame envelope: `{messageType, senderClientId?,
/// correlationId?, messagePayload}`, `messagePayload` base64 of the inner
/// SDP/ICE-candidate-init JSON (or, for STATUS_RESPONSE, of nothing —
/// status frames carry their fields inline, see `StatusResponsePayload`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalingFrame {
    #[serde(rename = "messageType")]
    pub message_type: MessageType,
    #[serde(rename = "senderClientId", default, skip_serializing_if = "Option::is_none")]
    pub sender_client_id: Option<String>,
    #[serde(rename = "correlationId", default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(rename = "messagePayload")]
    pub message_payload: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponsePayload {
    #[serde(rename = "correlationId")]
    pub correlation_id: String,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub description: String,
}

impl SignalingFrame {
    pub fn encode_payload(inner_json: &str) -> String {
        BASE64.encode(inner_json.as_bytes())
    }

    pub fn decode_payload(&self) -> Result<Vec<u8>, WireError> {
        BASE64
            .decode(self.message_payload.as_bytes())
            .map_err(|e| WireError::Protocol(e.to_string()))
    }
}

/// An outbound application message, per §4.6: version, type, optional peer
/// client id (empty = broadcast), optional correlation id, and a payload.
/// `payload_length` is deliberately not a stored field — it's just
/// `payload.len()`, and a second source of truth for the same number would
/// only invite the two drifting apart.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub version: String,
    pub message_type: MessageType,
    pub peer_client_id: Option<String>,
    pub correlation_id: Option<String>,
    pub payload: Vec<u8>,
}

impl OutboundMessage {
    pub fn payload_length(&self) -> usize {
        self.payload.len()
    }

    pub fn into_frame(self) -> SignalingFrame {
        let payload_str = String::from_utf8_lossy(&self.payload).into_owned();
        SignalingFrame {
            message_type: self.message_type,
            sender_client_id: self.peer_client_id,
            correlation_id: self.correlation_id,
            message_payload: SignalingFrame::encode_payload(&payload_str),
        }
    }
}

#[cfg(test)]
mod wire_test {
    use super::*;

    #[test]
    fn parse_sdp_rejects_non_json() {
        assert!(matches!(parse_sdp("helloWorld"), Err(WireError::Protocol(_))));
    }

    #[test]
    fn parse_sdp_empty_object_is_protocol_error() {
        assert!(matches!(parse_sdp("{}"), Err(WireError::Protocol(_))));
    }

    #[test]
    fn parse_sdp_missing_sdp() {
        assert_eq!(parse_sdp(r#"{"type":"offer"}"#), Err(WireError::MissingSdp));
    }

    #[test]
    fn parse_sdp_missing_type() {
        assert_eq!(parse_sdp("{\"sdp\":\"v=0\\r\\n\"}"), Err(WireError::MissingType));
    }

    #[test]
    fn parse_sdp_invalid_type() {
        assert_eq!(
            parse_sdp("{\"sdp\":\"v=0\\r\\n\",\"type\":\"foobar\"}"),
            Err(WireError::InvalidType("foobar".to_owned()))
        );
    }

    #[test]
    fn parse_sdp_success() {
        let parsed = parse_sdp("{\"type\":\"offer\",\"sdp\":\"v=0\\r\\nWebRTC\\r\\n\"}").unwrap();
        assert_eq!(parsed.sdp_type, SdpType::Offer);
        assert_eq!(parsed.sdp, "v=0\r\nWebRTC\r\n");
    }

    #[test]
    fn serialize_then_parse_round_trips() {
        let original = SessionDescription {
            sdp_type: SdpType::Answer,
            sdp: "v=0\r\no=- 1 1 IN IP4 127.0.0.1\r\n".to_owned(),
        };
        let wire = serialize_sdp(&original);
        let back = parse_sdp(&wire).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn ice_candidate_init_requires_candidate() {
        assert_eq!(parse_ice_candidate_init(r#"{"sdpMid":"0"}"#), Err(WireError::MissingCandidate));
    }

    #[test]
    fn ice_candidate_init_round_trips() {
        let original = IceCandidateInit {
            candidate: "candidate:1 1 udp 2130706431 10.0.0.1 5000 typ host".to_owned(),
            sdp_mid: "0".to_owned(),
            sdp_mline_index: 0,
        };
        let wire = serialize_ice_candidate_init(&original);
        let back = parse_ice_candidate_init(&wire).unwrap();
        assert_eq!(back, original);
    }
}
