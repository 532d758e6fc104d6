//! Room URL construction.
//!
//! The connect URL is derived from the server's HTTP origin with the scheme
//! upgraded to its websocket equivalent, the room id as a path segment, and
//! an optional `handle` query parameter.

use crate::traits::TransportError;

/// Characters permitted in a handle, matching the server's login filter.
fn sanitize_handle(handle: &str) -> String {
    handle
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '@'))
        .collect()
}

/// Build the websocket URL for a room.
///
/// `origin` may be an `http(s)` origin (scheme is upgraded to `ws(s)`) or
/// already a `ws(s)` URL.
///
/// # Errors
///
/// Returns an error if the origin carries an unsupported scheme or the room
/// id is empty.
pub fn room_url(
    origin: &str,
    room_id: &str,
    handle: Option<&str>,
) -> Result<String, TransportError> {
    if room_id.is_empty() {
        return Err(TransportError::InvalidUrl("Empty room id".into()));
    }

    let origin = origin.trim_end_matches('/');
    let base = if let Some(rest) = origin.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = origin.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if origin.starts_with("wss://") || origin.starts_with("ws://") {
        origin.to_string()
    } else {
        return Err(TransportError::InvalidUrl(format!(
            "Unsupported scheme in origin: {origin}"
        )));
    };

    let mut url = format!("{base}/ws/{room_id}");

    if let Some(handle) = handle {
        let handle = sanitize_handle(handle);
        if !handle.is_empty() {
            url.push_str("?handle=");
            url.push_str(&handle);
        }
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_upgrade() {
        assert_eq!(
            room_url("http://chat.example.org", "lobby", None).unwrap(),
            "ws://chat.example.org/ws/lobby"
        );
        assert_eq!(
            room_url("https://chat.example.org/", "lobby", None).unwrap(),
            "wss://chat.example.org/ws/lobby"
        );
    }

    #[test]
    fn test_ws_origin_passthrough() {
        assert_eq!(
            room_url("ws://127.0.0.1:9000", "r1", None).unwrap(),
            "ws://127.0.0.1:9000/ws/r1"
        );
    }

    #[test]
    fn test_handle_query() {
        assert_eq!(
            room_url("http://h", "r", Some("alice")).unwrap(),
            "ws://h/ws/r?handle=alice"
        );
        // Disallowed characters are stripped, like the server's login filter.
        assert_eq!(
            room_url("http://h", "r", Some("al ice<>!")).unwrap(),
            "ws://h/ws/r?handle=alice"
        );
        // A handle that sanitizes to nothing is omitted entirely.
        assert_eq!(
            room_url("http://h", "r", Some("  ")).unwrap(),
            "ws://h/ws/r"
        );
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(room_url("ftp://h", "r", None).is_err());
        assert!(room_url("http://h", "", None).is_err());
    }
}
