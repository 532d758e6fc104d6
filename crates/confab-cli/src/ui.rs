//! Terminal rendering of room activity.
//!
//! Attaches display observers to the session; they run after the state
//! reconciler, so the roster and self identity are already up to date when
//! an event is rendered.

use confab_core::{Session, SessionState};
use confab_protocol::{Event, EventType};

/// Attach the display observers for every user-visible event.
pub fn attach(session: &mut Session) {
    session.subscribe(EventType::Connect, |_, _, _| {
        println!("* connected");
    });

    session.subscribe(EventType::Disconnect, |_, _, _| {
        println!("* disconnected");
    });

    session.subscribe(EventType::Reconnecting, |_, _, event| {
        if let Event::Reconnecting { wait_ms } = event {
            println!("* reconnecting in {wait_ms} ms");
        }
    });

    session.subscribe(EventType::PeerInfo, |_, _, event| {
        if let Event::PeerInfo { data, .. } = event {
            println!("* you are {}", data.handle);
        }
    });

    session.subscribe(EventType::PeerList, |state: &mut SessionState, _, _| {
        let handles: Vec<&str> = state.roster.sorted().iter().map(|p| p.handle.as_str()).collect();
        println!("* peers: {}", handles.join(", "));
    });

    session.subscribe(EventType::PeerJoin, |_, _, event| {
        if let Event::PeerJoin { data, .. } = event {
            println!("* {} joined", data.handle);
        }
    });

    session.subscribe(EventType::PeerLeave, |_, _, event| {
        if let Event::PeerLeave { data, .. } = event {
            println!("* {} left", data.handle);
        }
    });

    session.subscribe(EventType::Message, |state: &mut SessionState, _, event| {
        if let Event::Message { data, .. } = event {
            if state.is_self(&data.peer_id) {
                println!("<{}> {} (you)", data.peer_handle, data.text);
            } else {
                println!("<{}> {}", data.peer_handle, data.text);
            }
        }
    });

    session.subscribe(EventType::Typing, |state: &mut SessionState, _, event| {
        if let Event::Typing { data, .. } = event {
            // The reconciler ignores self and unknown peers; mirror that here.
            if !state.is_self(&data.id) && state.roster.contains(&data.id) {
                println!("... {} is typing", data.handle);
            }
        }
    });

    session.subscribe(EventType::Notice, |_, _, event| {
        if let Event::Notice { data, .. } = event {
            println!("! {data}");
        }
    });
}
