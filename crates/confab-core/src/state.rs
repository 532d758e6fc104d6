//! Client-visible session state.
//!
//! The state is owned by one [`crate::session::Session`] and mutated only by
//! the reconciler's merge rules; nothing here performs I/O or can fail.

use confab_protocol::Peer;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Kind of a timeline entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A chat message.
    Chat,
    /// A synthetic "peer joined" marker.
    Join,
    /// A synthetic "peer left" marker.
    Leave,
}

/// One entry in the message timeline.
///
/// The timeline is append-only and ordered by arrival, never by timestamp;
/// timestamps are display metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineEntry {
    pub kind: EntryKind,
    pub peer: Peer,
    /// Message body; `None` for join/leave markers.
    pub text: Option<String>,
    /// Server timestamp in epoch milliseconds.
    pub timestamp: u64,
}

impl TimelineEntry {
    /// Create a chat entry.
    #[must_use]
    pub fn chat(peer: Peer, text: impl Into<String>, timestamp: u64) -> Self {
        Self {
            kind: EntryKind::Chat,
            peer,
            text: Some(text.into()),
            timestamp,
        }
    }

    /// Create a join marker.
    #[must_use]
    pub fn join(peer: Peer, timestamp: u64) -> Self {
        Self {
            kind: EntryKind::Join,
            peer,
            text: None,
            timestamp,
        }
    }

    /// Create a leave marker.
    #[must_use]
    pub fn leave(peer: Peer, timestamp: u64) -> Self {
        Self {
            kind: EntryKind::Leave,
            peer,
            text: None,
            timestamp,
        }
    }
}

/// The peer roster: a set keyed by peer id.
///
/// The server guarantees no ordering; [`Roster::sorted`] gives the display
/// order (case-sensitive lexical by handle, ties broken by id for
/// stability).
#[derive(Debug, Clone, Default)]
pub struct Roster {
    peers: HashMap<String, Peer>,
}

impl Roster {
    /// Create an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of peers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Check if the roster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Check if a peer id is present.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.peers.contains_key(id)
    }

    /// Look up a peer by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Peer> {
        self.peers.get(id)
    }

    /// Insert a peer. Idempotent: returns `true` only if the peer was new.
    pub fn insert(&mut self, peer: Peer) -> bool {
        self.peers.insert(peer.id.clone(), peer).is_none()
    }

    /// Remove a peer by id.
    pub fn remove(&mut self, id: &str) -> Option<Peer> {
        self.peers.remove(id)
    }

    /// Replace the roster wholesale with an authoritative push.
    pub fn replace_all(&mut self, peers: Vec<Peer>) {
        self.peers = peers.into_iter().map(|p| (p.id.clone(), p)).collect();
    }

    /// Peers in display order.
    #[must_use]
    pub fn sorted(&self) -> Vec<&Peer> {
        let mut list: Vec<&Peer> = self.peers.values().collect();
        list.sort_by(|a, b| a.handle.cmp(&b.handle).then_with(|| a.id.cmp(&b.id)));
        list
    }
}

/// A transient typing indicator for one peer.
#[derive(Debug, Clone)]
pub struct TypingEntry {
    pub peer: Peer,
    /// When the last `typing` signal from this peer arrived.
    pub last_signal: Instant,
}

/// The set of currently-typing peers.
///
/// Entries are soft state: refreshed by inbound `typing` signals, cleared by
/// a chat message or departure of the peer, and expired by the periodic
/// sweep.
#[derive(Debug, Clone, Default)]
pub struct TypingSet {
    entries: HashMap<String, TypingEntry>,
}

impl TypingSet {
    /// Create an empty typing set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of typing peers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if a peer is currently marked as typing.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Create or refresh the entry for a peer.
    pub fn upsert(&mut self, peer: Peer, now: Instant) {
        self.entries.insert(
            peer.id.clone(),
            TypingEntry {
                peer,
                last_signal: now,
            },
        );
    }

    /// Clear the entry for a peer. Idempotent: returns `true` if one existed.
    pub fn clear(&mut self, id: &str) -> bool {
        self.entries.remove(id).is_some()
    }

    /// Evict entries whose last signal is older than `interval`.
    ///
    /// Returns the evicted peer ids.
    pub fn sweep(&mut self, now: Instant, interval: Duration) -> Vec<String> {
        let stale: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| now.saturating_duration_since(e.last_signal) > interval)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &stale {
            self.entries.remove(id);
        }

        stale
    }

    /// Typing peers in display order.
    #[must_use]
    pub fn peers(&self) -> Vec<&Peer> {
        let mut list: Vec<&Peer> = self.entries.values().map(|e| &e.peer).collect();
        list.sort_by(|a, b| a.handle.cmp(&b.handle).then_with(|| a.id.cmp(&b.id)));
        list
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The server closed the connection normally with no policy reason.
    ConnectionClosed,
    /// A peer disposed the room.
    RoomDisposed,
    /// The room was at capacity.
    RoomFull,
    /// This client was rate-limited by the server.
    RateLimited,
    /// Explicit local logout.
    LoggedOut,
}

/// Presentation state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Not yet connected.
    Offline,
    /// Connected and live.
    Online,
    /// Connection lost; a reconnect is pending.
    Reconnecting,
    /// Terminal; rejoining requires a fresh session.
    Ended(EndReason),
}

/// All client-visible state for one room session.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Connection epoch; incremented on each successful (re)connect.
    pub epoch: u64,
    pub phase: SessionPhase,
    /// Self identity, authoritative from the epoch's `peer.info`.
    pub self_peer: Option<Peer>,
    pub roster: Roster,
    pub timeline: Vec<TimelineEntry>,
    pub typing: TypingSet,
}

impl SessionState {
    /// Create a fresh, offline state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: 0,
            phase: SessionPhase::Offline,
            self_peer: None,
            roster: Roster::new(),
            timeline: Vec::new(),
            typing: TypingSet::new(),
        }
    }

    /// Check whether an id refers to Self.
    #[must_use]
    pub fn is_self(&self, id: &str) -> bool {
        self.self_peer.as_ref().is_some_and(|p| p.id == id)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
