//! Connection lifecycle supervision.
//!
//! The supervisor is a synchronous state machine: the session loop feeds it
//! lifecycle observations (opened, closed, connect failed) and executes the
//! returned transition — the events to publish and whether to schedule a
//! reconnect. Keeping the machine free of timers and I/O makes the
//! reconnect policy directly testable.

use confab_protocol::close::{classify, CloseClass};
use confab_protocol::Event;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default wait before a reconnect attempt. Fixed interval, no backoff.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(4000);

/// Connection lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnPhase {
    /// No connection and none wanted.
    Idle,
    /// A connect attempt is in progress.
    Connecting,
    /// Live connection.
    Connected,
    /// Unexpected loss; one reconnect attempt is scheduled.
    Disconnected,
    /// Terminal for this session; no reconnect will be scheduled.
    Disposed,
}

/// What the session loop must do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Nothing to schedule.
    None,
    /// Schedule exactly one reconnect attempt after the given wait.
    Reconnect(Duration),
}

/// Result of feeding an observation to the supervisor.
#[derive(Debug)]
pub struct Transition {
    /// Events to publish on the dispatcher, in order.
    pub events: Vec<Event>,
    pub directive: Directive,
}

impl Transition {
    fn none() -> Self {
        Self {
            events: Vec::new(),
            directive: Directive::None,
        }
    }

    fn with_events(events: Vec<Event>) -> Self {
        Self {
            events,
            directive: Directive::None,
        }
    }
}

/// The reconnection supervisor.
#[derive(Debug)]
pub struct Supervisor {
    phase: ConnPhase,
    reconnect_interval: Duration,
    epoch: u64,
}

impl Supervisor {
    /// Create a supervisor with the given reconnect interval.
    #[must_use]
    pub fn new(reconnect_interval: Duration) -> Self {
        Self {
            phase: ConnPhase::Idle,
            reconnect_interval,
            epoch: 0,
        }
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> ConnPhase {
        self.phase
    }

    /// Current connection epoch (number of successful connects).
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Mark the start of a connect attempt.
    pub fn begin_connect(&mut self) {
        self.phase = ConnPhase::Connecting;
    }

    /// The connect attempt succeeded; a new epoch begins.
    ///
    /// Entering `Connected` implicitly cancels any pending reconnect: the
    /// loop only schedules from a `Reconnect` directive, and none is
    /// outstanding once this returns.
    pub fn on_opened(&mut self) -> Event {
        self.phase = ConnPhase::Connected;
        self.epoch += 1;
        info!(epoch = self.epoch, "Connected");
        Event::Connect
    }

    /// The connect attempt failed. Treated like an abnormal close.
    pub fn on_connect_failed(&mut self) -> Transition {
        self.lost()
    }

    /// The connection closed with the given code and reason.
    pub fn on_closed(&mut self, code: u16, reason: &str) -> Transition {
        match classify(code, reason) {
            CloseClass::Normal => {
                info!(code, "Connection closed normally");
                self.phase = ConnPhase::Disposed;
                Transition::with_events(vec![Event::Disconnect])
            }
            CloseClass::Ignored => {
                debug!(code, "Close without status; ignoring");
                self.phase = ConnPhase::Idle;
                Transition::none()
            }
            CloseClass::Terminal(tag) => {
                info!(code, reason = %tag, "Session terminated by server");
                self.phase = ConnPhase::Disposed;
                let mut events = Vec::new();
                if let Some(event) = Event::terminal(tag) {
                    events.push(event);
                }
                Transition::with_events(events)
            }
            CloseClass::Abnormal => {
                warn!(code, %reason, "Connection lost");
                self.lost()
            }
        }
    }

    /// An explicit local close (logout). Terminal; cancels any reconnect.
    pub fn on_local_close(&mut self) {
        debug!("Local close");
        self.phase = ConnPhase::Disposed;
    }

    fn lost(&mut self) -> Transition {
        self.phase = ConnPhase::Disconnected;
        let wait = self.reconnect_interval;
        Transition {
            events: vec![
                Event::Disconnect,
                Event::reconnecting(wait.as_millis() as u64),
            ],
            directive: Directive::Reconnect(wait),
        }
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new(DEFAULT_RECONNECT_INTERVAL)
    }
}
