//! Close-code classification.
//!
//! A websocket close carries a numeric code and an optional reason string;
//! the server additionally rides terminal policy reasons (`room.dispose`,
//! `room.full`, `peer.ratelimited`) inside the reason text. This module maps
//! the `(code, reason)` pair to exactly one disposition instead of inferring
//! it ad hoc at each call site.

use std::str::FromStr;

use crate::events::EventType;

/// Normal closure.
pub const NORMAL_CLOSE_CODE: u16 = 1000;

/// No status code present in the close frame.
pub const NO_STATUS_CLOSE_CODE: u16 = 1005;

/// Synthetic code for a connection torn down without a close frame
/// (transport error, stream ended mid-flight).
pub const ABNORMAL_CLOSE_CODE: u16 = 1006;

/// Disposition of a connection close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseClass {
    /// Clean close with no recognized policy reason. The session is over;
    /// no reconnect.
    Normal,

    /// Close frame without a status code. Treated as a non-event: nothing
    /// is surfaced and no reconnect is scheduled.
    Ignored,

    /// The server terminated the session for a policy reason. Surfaced as a
    /// terminal notice; no reconnect.
    Terminal(EventType),

    /// Unexpected loss. Exactly one reconnect attempt is scheduled.
    Abnormal,
}

/// Classify a close `(code, reason)` pair.
///
/// A terminal reason string wins over the code: servers have been observed
/// sending policy reasons on non-1000 codes, so `(4001, "room.full")` is
/// terminal, not abnormal.
#[must_use]
pub fn classify(code: u16, reason: &str) -> CloseClass {
    if let Ok(tag) = EventType::from_str(reason.trim()) {
        if tag.is_terminal() {
            return CloseClass::Terminal(tag);
        }
    }

    match code {
        NORMAL_CLOSE_CODE => CloseClass::Normal,
        NO_STATUS_CLOSE_CODE => CloseClass::Ignored,
        _ => CloseClass::Abnormal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_close() {
        assert_eq!(classify(1000, ""), CloseClass::Normal);
        assert_eq!(classify(1000, "bye"), CloseClass::Normal);
    }

    #[test]
    fn test_terminal_reason_on_normal_code() {
        assert_eq!(
            classify(1000, "room.dispose"),
            CloseClass::Terminal(EventType::RoomDispose)
        );
        assert_eq!(
            classify(1000, "peer.ratelimited"),
            CloseClass::Terminal(EventType::PeerRatelimited)
        );
    }

    #[test]
    fn test_terminal_reason_wins_over_code() {
        assert_eq!(
            classify(4001, "room.full"),
            CloseClass::Terminal(EventType::RoomFull)
        );
    }

    #[test]
    fn test_non_terminal_reason_is_not_terminal() {
        // A reason that parses as a known tag but is not a policy
        // termination does not end the session.
        assert_eq!(classify(1000, "notice"), CloseClass::Normal);
        assert_eq!(classify(1006, "message"), CloseClass::Abnormal);
    }

    #[test]
    fn test_no_status_is_ignored() {
        assert_eq!(classify(1005, ""), CloseClass::Ignored);
    }

    #[test]
    fn test_abnormal_codes() {
        assert_eq!(classify(1006, ""), CloseClass::Abnormal);
        assert_eq!(classify(1011, "server error"), CloseClass::Abnormal);
        assert_eq!(classify(4000, ""), CloseClass::Abnormal);
    }
}
