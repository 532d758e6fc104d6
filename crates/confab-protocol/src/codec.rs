//! Codec for encoding and decoding confab frames.
//!
//! The wire format is plain JSON text, one event per websocket text frame.

use thiserror::Error;

use crate::events::{Event, Request};

/// Maximum accepted frame size (64 KiB).
pub const MAX_EVENT_SIZE: usize = 64 * 1024;

/// Protocol errors that can occur during encoding/decoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame exceeds maximum size.
    #[error("Frame size {0} exceeds maximum {MAX_EVENT_SIZE}")]
    FrameTooLarge(usize),

    /// JSON encoding error.
    #[error("Encoding error: {0}")]
    Encode(#[source] serde_json::Error),

    /// JSON decoding error. Also raised for unknown type tags.
    #[error("Decoding error: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Encode an outbound request to a JSON text frame.
///
/// # Errors
///
/// Returns an error if the request is too large or encoding fails.
pub fn encode(request: &Request) -> Result<String, ProtocolError> {
    let text = serde_json::to_string(request).map_err(ProtocolError::Encode)?;

    if text.len() > MAX_EVENT_SIZE {
        return Err(ProtocolError::FrameTooLarge(text.len()));
    }

    Ok(text)
}

/// Decode an inbound JSON text frame into an event.
///
/// # Errors
///
/// Returns an error if the frame is too large, malformed, or carries an
/// unknown type tag. Callers drop such frames without tearing down the
/// connection.
pub fn decode(text: &str) -> Result<Event, ProtocolError> {
    if text.len() > MAX_EVENT_SIZE {
        return Err(ProtocolError::FrameTooLarge(text.len()));
    }

    serde_json::from_str(text).map_err(ProtocolError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventType, Peer};

    #[test]
    fn test_decode_chat_message() {
        let text = r#"{"type":"message","timestamp":1714000000000,
            "data":{"peer_id":"b2","peer_handle":"bob","message":"hi"}}"#;
        let event = decode(text).unwrap();

        match event {
            Event::Message { timestamp, data } => {
                assert_eq!(timestamp, 1_714_000_000_000);
                assert_eq!(data.peer_id, "b2");
                assert_eq!(data.peer_handle, "bob");
                assert_eq!(data.text, "hi");
            }
            other => panic!("Expected Message, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_peer_list() {
        let text = r#"{"type":"peer.list","timestamp":1,
            "data":[{"id":"a1","handle":"alice"},{"id":"b2","handle":"bob"}]}"#;
        let event = decode(text).unwrap();

        match event {
            Event::PeerList { data, .. } => {
                assert_eq!(data.len(), 2);
                assert_eq!(data[0], Peer::new("a1", "alice"));
            }
            other => panic!("Expected PeerList, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_peer_info() {
        let text = r#"{"type":"peer.info","timestamp":1,"data":{"id":"a1","handle":"alice"}}"#;
        let event = decode(text).unwrap();
        assert_eq!(event.event_type(), EventType::PeerInfo);
    }

    #[test]
    fn test_decode_bare_terminal_event() {
        // Terminal events may arrive with no data payload at all.
        let event = decode(r#"{"type":"room.dispose","timestamp":2}"#).unwrap();
        assert_eq!(event.event_type(), EventType::RoomDispose);
    }

    #[test]
    fn test_decode_unknown_type_fails() {
        assert!(matches!(
            decode(r#"{"type":"peer.rename","data":{}}"#),
            Err(ProtocolError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_malformed_fails() {
        assert!(decode("{not json").is_err());
        assert!(decode(r#"{"type":"message","data":"not an object"}"#).is_err());
    }

    #[test]
    fn test_decode_too_large() {
        let text = format!(
            r#"{{"type":"notice","timestamp":0,"data":"{}"}}"#,
            "x".repeat(MAX_EVENT_SIZE)
        );
        assert!(matches!(
            decode(&text),
            Err(ProtocolError::FrameTooLarge(_))
        ));
    }

    #[test]
    fn test_encode_request_shapes() {
        assert_eq!(
            encode(&Request::message("hi")).unwrap(),
            r#"{"type":"message","data":"hi"}"#
        );
        assert_eq!(encode(&Request::Typing).unwrap(), r#"{"type":"typing"}"#);
        assert_eq!(
            encode(&Request::PeerList).unwrap(),
            r#"{"type":"peer.list"}"#
        );
        assert_eq!(
            encode(&Request::RoomDispose).unwrap(),
            r#"{"type":"room.dispose"}"#
        );
    }
}
