//! Reconciler merge rules.
//!
//! One handler per known event type, registered on the dispatcher. Each
//! applies its event to the session state; none can fail. State is preserved
//! across a transient disconnect and only replaced when a new epoch pushes
//! fresh `peer.info` / `peer.list` data.

use confab_protocol::{Event, EventType, Request};
use std::time::Instant;
use tracing::{debug, trace};

use crate::dispatcher::{Dispatcher, Outbox};
use crate::state::{EndReason, SessionPhase, SessionState, TimelineEntry};

/// Subscribe the reconciler to every known event type.
pub fn register(bus: &mut Dispatcher<SessionState>) {
    bus.subscribe(EventType::Connect, on_connect);
    bus.subscribe(EventType::Disconnect, on_disconnect);
    bus.subscribe(EventType::Reconnecting, on_reconnecting);
    bus.subscribe(EventType::PeerInfo, on_peer_info);
    bus.subscribe(EventType::PeerList, on_peer_list);
    bus.subscribe(EventType::PeerJoin, on_peer_join);
    bus.subscribe(EventType::PeerLeave, on_peer_leave);
    bus.subscribe(EventType::Message, on_message);
    bus.subscribe(EventType::Typing, on_typing);
    bus.subscribe(EventType::RoomDispose, on_room_dispose);
    bus.subscribe(EventType::RoomFull, on_room_full);
    bus.subscribe(EventType::PeerRatelimited, on_ratelimited);
    bus.subscribe(EventType::Notice, on_notice);
    bus.subscribe(EventType::Handle, on_handle);
}

fn on_connect(state: &mut SessionState, outbox: &mut Outbox, _event: &Event) {
    state.epoch += 1;
    state.phase = SessionPhase::Online;
    debug!(epoch = state.epoch, "Session online");

    // First action of a new epoch: ask for the authoritative roster.
    outbox.push(Request::PeerList);
}

fn on_disconnect(state: &mut SessionState, _outbox: &mut Outbox, _event: &Event) {
    // A `reconnecting` event may follow immediately and override this.
    state.phase = SessionPhase::Ended(EndReason::ConnectionClosed);
}

fn on_reconnecting(state: &mut SessionState, _outbox: &mut Outbox, event: &Event) {
    let Event::Reconnecting { wait_ms } = event else {
        return;
    };
    state.phase = SessionPhase::Reconnecting;
    debug!(wait_ms, "Reconnecting");
}

fn on_peer_info(state: &mut SessionState, _outbox: &mut Outbox, event: &Event) {
    let Event::PeerInfo { data, .. } = event else {
        return;
    };
    debug!(id = %data.id, handle = %data.handle, "Self identity set");
    state.self_peer = Some(data.clone());
}

fn on_peer_list(state: &mut SessionState, _outbox: &mut Outbox, event: &Event) {
    let Event::PeerList { data, .. } = event else {
        return;
    };
    debug!(peers = data.len(), "Roster replaced");
    state.roster.replace_all(data.clone());
}

fn on_peer_join(state: &mut SessionState, _outbox: &mut Outbox, event: &Event) {
    let Event::PeerJoin { timestamp, data } = event else {
        return;
    };
    state.roster.insert(data.clone());
    state
        .timeline
        .push(TimelineEntry::join(data.clone(), *timestamp));
}

fn on_peer_leave(state: &mut SessionState, _outbox: &mut Outbox, event: &Event) {
    let Event::PeerLeave { timestamp, data } = event else {
        return;
    };
    state.roster.remove(&data.id);
    state.typing.clear(&data.id);
    state
        .timeline
        .push(TimelineEntry::leave(data.clone(), *timestamp));
}

fn on_message(state: &mut SessionState, _outbox: &mut Outbox, event: &Event) {
    let Event::Message { timestamp, data } = event else {
        return;
    };
    // A sent message supersedes any typing indicator from that peer.
    state.typing.clear(&data.peer_id);
    state
        .timeline
        .push(TimelineEntry::chat(data.sender(), &data.text, *timestamp));
}

fn on_typing(state: &mut SessionState, _outbox: &mut Outbox, event: &Event) {
    let Event::Typing { data, .. } = event else {
        return;
    };
    // Never show typing for Self, and never for a peer not in the roster.
    if state.is_self(&data.id) || !state.roster.contains(&data.id) {
        return;
    }
    state.typing.upsert(data.clone(), Instant::now());
}

fn on_room_dispose(state: &mut SessionState, _outbox: &mut Outbox, _event: &Event) {
    debug!("Room disposed");
    state.phase = SessionPhase::Ended(EndReason::RoomDisposed);
}

fn on_room_full(state: &mut SessionState, _outbox: &mut Outbox, _event: &Event) {
    debug!("Room full");
    state.phase = SessionPhase::Ended(EndReason::RoomFull);
}

fn on_ratelimited(state: &mut SessionState, _outbox: &mut Outbox, _event: &Event) {
    debug!("Rate-limited by server");
    state.phase = SessionPhase::Ended(EndReason::RateLimited);
}

fn on_notice(_state: &mut SessionState, _outbox: &mut Outbox, event: &Event) {
    if let Event::Notice { data, .. } = event {
        debug!(notice = %data, "Server notice");
    }
}

fn on_handle(_state: &mut SessionState, _outbox: &mut Outbox, _event: &Event) {
    trace!("Ignoring legacy handle frame");
}

#[cfg(test)]
mod tests {
    use super::*;
    use confab_protocol::{ChatPayload, Peer};
    use std::time::Duration;

    struct Fixture {
        bus: Dispatcher<SessionState>,
        state: SessionState,
        outbox: Outbox,
    }

    impl Fixture {
        fn new() -> Self {
            let mut bus = Dispatcher::new();
            register(&mut bus);
            Self {
                bus,
                state: SessionState::new(),
                outbox: Outbox::new(),
            }
        }

        fn apply(&mut self, event: Event) {
            self.bus.publish(&mut self.state, &mut self.outbox, &event);
        }
    }

    fn join(id: &str, handle: &str) -> Event {
        Event::PeerJoin {
            timestamp: 0,
            data: Peer::new(id, handle),
        }
    }

    fn leave(id: &str, handle: &str) -> Event {
        Event::PeerLeave {
            timestamp: 0,
            data: Peer::new(id, handle),
        }
    }

    fn chat(id: &str, handle: &str, text: &str) -> Event {
        Event::Message {
            timestamp: 0,
            data: ChatPayload {
                peer_id: id.into(),
                peer_handle: handle.into(),
                text: text.into(),
            },
        }
    }

    fn typing(id: &str, handle: &str) -> Event {
        Event::Typing {
            timestamp: 0,
            data: Peer::new(id, handle),
        }
    }

    #[test]
    fn test_roster_equals_joined_minus_left() {
        let mut fx = Fixture::new();

        fx.apply(join("a1", "alice"));
        fx.apply(join("b2", "bob"));
        // Unrelated interleaved events must not disturb the roster.
        fx.apply(Event::Notice {
            timestamp: 0,
            data: "hello".into(),
        });
        fx.apply(join("c3", "carol"));
        fx.apply(leave("b2", "bob"));
        fx.apply(chat("a1", "alice", "hi"));
        fx.apply(join("a1", "alice")); // re-join is idempotent
        fx.apply(leave("d4", "dave")); // never joined

        assert_eq!(fx.state.roster.len(), 2);
        assert!(fx.state.roster.contains("a1"));
        assert!(fx.state.roster.contains("c3"));
        assert!(!fx.state.roster.contains("b2"));
    }

    #[test]
    fn test_join_and_leave_append_timeline_markers() {
        let mut fx = Fixture::new();

        fx.apply(join("a1", "alice"));
        fx.apply(leave("a1", "alice"));

        assert_eq!(fx.state.timeline.len(), 2);
        assert_eq!(fx.state.timeline[0].kind, crate::state::EntryKind::Join);
        assert_eq!(fx.state.timeline[1].kind, crate::state::EntryKind::Leave);
    }

    #[test]
    fn test_message_clears_typing_for_sender() {
        let mut fx = Fixture::new();

        fx.apply(join("b2", "bob"));
        fx.apply(typing("b2", "bob"));
        assert!(fx.state.typing.contains("b2"));

        fx.apply(chat("b2", "bob", "done typing"));
        assert!(!fx.state.typing.contains("b2"));

        // Idempotent when no entry exists.
        fx.apply(chat("b2", "bob", "again"));
        assert_eq!(fx.state.timeline.len(), 3);
    }

    #[test]
    fn test_typing_from_self_is_ignored() {
        let mut fx = Fixture::new();

        fx.apply(Event::PeerInfo {
            timestamp: 0,
            data: Peer::new("a1", "alice"),
        });
        fx.apply(join("a1", "alice"));
        fx.apply(typing("a1", "alice"));

        assert!(fx.state.typing.is_empty());
    }

    #[test]
    fn test_typing_from_unknown_peer_is_ignored() {
        let mut fx = Fixture::new();

        fx.apply(typing("z9", "zed"));
        assert!(fx.state.typing.is_empty());
    }

    #[test]
    fn test_peer_leave_clears_typing() {
        let mut fx = Fixture::new();

        fx.apply(join("b2", "bob"));
        fx.apply(typing("b2", "bob"));
        fx.apply(leave("b2", "bob"));

        assert!(fx.state.typing.is_empty());
    }

    #[test]
    fn test_connect_requests_roster_and_bumps_epoch() {
        let mut fx = Fixture::new();

        fx.apply(Event::Connect);
        assert_eq!(fx.state.epoch, 1);
        assert_eq!(fx.state.phase, SessionPhase::Online);

        let queued: Vec<_> = fx.outbox.drain().collect();
        assert_eq!(queued, vec![Request::PeerList]);
    }

    #[test]
    fn test_state_survives_disconnect_reconnect_cycle() {
        let mut fx = Fixture::new();

        fx.apply(Event::Connect);
        fx.apply(Event::PeerList {
            timestamp: 0,
            data: vec![Peer::new("a1", "alice"), Peer::new("b2", "bob")],
        });
        fx.apply(chat("b2", "bob", "hi"));

        fx.apply(Event::Disconnect);
        fx.apply(Event::reconnecting(4000));
        assert_eq!(fx.state.phase, SessionPhase::Reconnecting);

        // Roster and timeline are intact until the new epoch replaces them.
        assert_eq!(fx.state.roster.len(), 2);
        assert_eq!(fx.state.timeline.len(), 1);

        fx.apply(Event::Connect);
        assert_eq!(fx.state.epoch, 2);
        fx.apply(Event::PeerList {
            timestamp: 0,
            data: vec![Peer::new("a1", "alice")],
        });
        assert_eq!(fx.state.roster.len(), 1);
    }

    #[test]
    fn test_normal_close_without_reconnect_ends_session() {
        let mut fx = Fixture::new();

        fx.apply(Event::Connect);
        fx.apply(Event::Disconnect);
        assert_eq!(
            fx.state.phase,
            SessionPhase::Ended(EndReason::ConnectionClosed)
        );
    }

    #[test]
    fn test_terminal_events_set_phase() {
        for (event, reason) in [
            (Event::RoomDispose { timestamp: 0 }, EndReason::RoomDisposed),
            (Event::RoomFull { timestamp: 0 }, EndReason::RoomFull),
            (
                Event::PeerRatelimited { timestamp: 0 },
                EndReason::RateLimited,
            ),
        ] {
            let mut fx = Fixture::new();
            fx.apply(event);
            assert_eq!(fx.state.phase, SessionPhase::Ended(reason));
        }
    }

    #[test]
    fn test_concrete_connect_flow() {
        // connect → peer.info a1/alice → peer.list [a1, b2] → message from b2.
        let mut fx = Fixture::new();

        fx.apply(Event::Connect);
        fx.apply(Event::PeerInfo {
            timestamp: 1,
            data: Peer::new("a1", "alice"),
        });
        fx.apply(Event::PeerList {
            timestamp: 2,
            data: vec![Peer::new("b2", "bob"), Peer::new("a1", "alice")],
        });
        fx.apply(chat("b2", "bob", "hi"));

        assert_eq!(fx.state.self_peer, Some(Peer::new("a1", "alice")));
        assert_eq!(fx.state.timeline.len(), 1);
        assert_eq!(fx.state.timeline[0].peer.id, "b2");
        assert_eq!(fx.state.timeline[0].text.as_deref(), Some("hi"));

        let handles: Vec<&str> = fx
            .state
            .roster
            .sorted()
            .iter()
            .map(|p| p.handle.as_str())
            .collect();
        assert_eq!(handles, vec!["alice", "bob"]);
    }

    #[test]
    fn test_typing_entry_expires_via_sweep() {
        let mut fx = Fixture::new();
        let interval = Duration::from_millis(3000);

        fx.apply(join("b2", "bob"));
        fx.apply(typing("b2", "bob"));

        let later = Instant::now() + Duration::from_millis(3100);
        let evicted = fx.state.typing.sweep(later, interval);
        assert_eq!(evicted, vec!["b2".to_string()]);
        assert!(fx.state.typing.is_empty());
    }
}
