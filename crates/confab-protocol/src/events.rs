//! Event types for the confab room protocol.
//!
//! Events are the fundamental unit of communication. The tag set is closed:
//! dispatch happens over [`EventType`] rather than raw strings, so a typo in
//! a handler registration is a compile error, not a silently dead callback.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A room participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    /// Opaque server-assigned identifier, unique within a room.
    pub id: String,
    /// Display name.
    pub handle: String,
}

impl Peer {
    /// Create a new peer.
    #[must_use]
    pub fn new(id: impl Into<String>, handle: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            handle: handle.into(),
        }
    }
}

/// Payload of an inbound chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPayload {
    /// Sender's peer id.
    pub peer_id: String,
    /// Sender's handle at send time.
    pub peer_handle: String,
    /// Message body.
    #[serde(rename = "message")]
    pub text: String,
}

impl ChatPayload {
    /// The sending peer as a [`Peer`].
    #[must_use]
    pub fn sender(&self) -> Peer {
        Peer::new(&self.peer_id, &self.peer_handle)
    }
}

/// Event type tags (closed set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "connect")]
    Connect,
    #[serde(rename = "disconnect")]
    Disconnect,
    #[serde(rename = "reconnecting")]
    Reconnecting,
    #[serde(rename = "room.dispose")]
    RoomDispose,
    #[serde(rename = "room.full")]
    RoomFull,
    #[serde(rename = "message")]
    Message,
    #[serde(rename = "typing")]
    Typing,
    #[serde(rename = "peer.list")]
    PeerList,
    #[serde(rename = "peer.info")]
    PeerInfo,
    #[serde(rename = "peer.join")]
    PeerJoin,
    #[serde(rename = "peer.leave")]
    PeerLeave,
    #[serde(rename = "peer.ratelimited")]
    PeerRatelimited,
    #[serde(rename = "notice")]
    Notice,
    #[serde(rename = "handle")]
    Handle,
}

impl EventType {
    /// All known event types, in wire-tag order.
    pub const ALL: [EventType; 14] = [
        EventType::Connect,
        EventType::Disconnect,
        EventType::Reconnecting,
        EventType::RoomDispose,
        EventType::RoomFull,
        EventType::Message,
        EventType::Typing,
        EventType::PeerList,
        EventType::PeerInfo,
        EventType::PeerJoin,
        EventType::PeerLeave,
        EventType::PeerRatelimited,
        EventType::Notice,
        EventType::Handle,
    ];

    /// Get the wire tag for this event type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Connect => "connect",
            EventType::Disconnect => "disconnect",
            EventType::Reconnecting => "reconnecting",
            EventType::RoomDispose => "room.dispose",
            EventType::RoomFull => "room.full",
            EventType::Message => "message",
            EventType::Typing => "typing",
            EventType::PeerList => "peer.list",
            EventType::PeerInfo => "peer.info",
            EventType::PeerJoin => "peer.join",
            EventType::PeerLeave => "peer.leave",
            EventType::PeerRatelimited => "peer.ratelimited",
            EventType::Notice => "notice",
            EventType::Handle => "handle",
        }
    }

    /// Whether this tag is a terminal policy reason: the server ended the
    /// session on purpose and the client must not reconnect automatically.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EventType::RoomDispose | EventType::RoomFull | EventType::PeerRatelimited
        )
    }

    /// Whether this tag is synthesized locally and never parsed off the wire.
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            EventType::Connect | EventType::Disconnect | EventType::Reconnecting
        )
    }
}

impl FromStr for EventType {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .iter()
            .find(|t| t.as_str() == s)
            .copied()
            .ok_or("Unknown event type")
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inbound (or locally synthesized) event.
///
/// Wire events carry the server's `timestamp` (epoch milliseconds); locally
/// synthesized lifecycle events (`Connect`, `Disconnect`, `Reconnecting`)
/// carry none. Timestamps are display metadata only — ordering is arrival
/// order, never timestamp order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The transport opened a connection; start of a new epoch.
    #[serde(rename = "connect")]
    Connect,

    /// The connection closed.
    #[serde(rename = "disconnect")]
    Disconnect,

    /// A reconnect attempt is scheduled after `wait_ms`.
    #[serde(rename = "reconnecting")]
    Reconnecting {
        /// Delay until the reconnect attempt, in milliseconds.
        wait_ms: u64,
    },

    /// The room was disposed by a peer. Terminal.
    #[serde(rename = "room.dispose")]
    RoomDispose {
        #[serde(default)]
        timestamp: u64,
    },

    /// The room is at capacity. Terminal.
    #[serde(rename = "room.full")]
    RoomFull {
        #[serde(default)]
        timestamp: u64,
    },

    /// This client sent too many messages. Terminal.
    #[serde(rename = "peer.ratelimited")]
    PeerRatelimited {
        #[serde(default)]
        timestamp: u64,
    },

    /// A chat message from a peer (possibly Self, echoed back).
    #[serde(rename = "message")]
    Message {
        #[serde(default)]
        timestamp: u64,
        data: ChatPayload,
    },

    /// A peer signalled that it is typing.
    #[serde(rename = "typing")]
    Typing {
        #[serde(default)]
        timestamp: u64,
        data: Peer,
    },

    /// Authoritative roster push; replaces the local roster wholesale.
    #[serde(rename = "peer.list")]
    PeerList {
        #[serde(default)]
        timestamp: u64,
        data: Vec<Peer>,
    },

    /// Self identity for this connection epoch; replaces Self wholesale.
    #[serde(rename = "peer.info")]
    PeerInfo {
        #[serde(default)]
        timestamp: u64,
        data: Peer,
    },

    /// A peer joined the room.
    #[serde(rename = "peer.join")]
    PeerJoin {
        #[serde(default)]
        timestamp: u64,
        data: Peer,
    },

    /// A peer left the room.
    #[serde(rename = "peer.leave")]
    PeerLeave {
        #[serde(default)]
        timestamp: u64,
        data: Peer,
    },

    /// Informational text from the server.
    #[serde(rename = "notice")]
    Notice {
        #[serde(default)]
        timestamp: u64,
        data: String,
    },

    /// Legacy self-identity frame; superseded by `peer.info`.
    #[serde(rename = "handle")]
    Handle {
        #[serde(default)]
        timestamp: u64,
        #[serde(default)]
        data: Option<serde_json::Value>,
    },
}

impl Event {
    /// Get the event type tag.
    #[must_use]
    pub fn event_type(&self) -> EventType {
        match self {
            Event::Connect => EventType::Connect,
            Event::Disconnect => EventType::Disconnect,
            Event::Reconnecting { .. } => EventType::Reconnecting,
            Event::RoomDispose { .. } => EventType::RoomDispose,
            Event::RoomFull { .. } => EventType::RoomFull,
            Event::PeerRatelimited { .. } => EventType::PeerRatelimited,
            Event::Message { .. } => EventType::Message,
            Event::Typing { .. } => EventType::Typing,
            Event::PeerList { .. } => EventType::PeerList,
            Event::PeerInfo { .. } => EventType::PeerInfo,
            Event::PeerJoin { .. } => EventType::PeerJoin,
            Event::PeerLeave { .. } => EventType::PeerLeave,
            Event::Notice { .. } => EventType::Notice,
            Event::Handle { .. } => EventType::Handle,
        }
    }

    /// Create a `reconnecting` event carrying the wait duration.
    #[must_use]
    pub fn reconnecting(wait_ms: u64) -> Self {
        Event::Reconnecting { wait_ms }
    }

    /// Build the terminal event for a terminal type tag, if it is one.
    #[must_use]
    pub fn terminal(tag: EventType) -> Option<Self> {
        match tag {
            EventType::RoomDispose => Some(Event::RoomDispose { timestamp: 0 }),
            EventType::RoomFull => Some(Event::RoomFull { timestamp: 0 }),
            EventType::PeerRatelimited => Some(Event::PeerRatelimited { timestamp: 0 }),
            _ => None,
        }
    }
}

/// An outbound request frame (client → server).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Send a chat message to the room.
    #[serde(rename = "message")]
    Message { data: String },

    /// Broadcast a typing indicator.
    #[serde(rename = "typing")]
    Typing,

    /// Request an authoritative roster push.
    #[serde(rename = "peer.list")]
    PeerList,

    /// Ask the server to dispose the room.
    #[serde(rename = "room.dispose")]
    RoomDispose,
}

impl Request {
    /// Create a chat message request.
    #[must_use]
    pub fn message(text: impl Into<String>) -> Self {
        Request::Message { data: text.into() }
    }
}
