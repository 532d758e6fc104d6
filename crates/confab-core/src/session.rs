//! The session event loop.
//!
//! A [`Session`] owns the dispatcher, the state, the typing gate, and the
//! supervisor, and drives them from a single `select!` loop over the live
//! connection, the command channel, and the typing sweep timer. Events from
//! one connection epoch are applied strictly in arrival order.

use confab_protocol::close::{ABNORMAL_CLOSE_CODE, NORMAL_CLOSE_CODE};
use confab_protocol::{Event, EventType, Request};
use confab_transport::{CloseInfo, Connection, Connector, TransportError};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, trace, warn};

use crate::dispatcher::{Dispatcher, Outbox};
use crate::reconcile;
use crate::state::{EndReason, SessionPhase, SessionState};
use crate::supervisor::{ConnPhase, Directive, Supervisor, Transition, DEFAULT_RECONNECT_INTERVAL};
use crate::typing::{TypingGate, DEFAULT_TYPING_DEBOUNCE};

/// Session tuning knobs.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Wait before a reconnect attempt after an unexpected loss.
    pub reconnect_interval: Duration,
    /// Debounce window for outbound typing signals; also the sweep period
    /// for inbound typing expiry.
    pub typing_debounce: Duration,
    /// Capacity of the command channel.
    pub command_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            typing_debounce: DEFAULT_TYPING_DEBOUNCE,
            command_buffer: 64,
        }
    }
}

/// Local user actions fed into the session loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Send a chat message.
    SendChat(String),
    /// A local typing trigger (keystroke).
    Typing,
    /// Ask the server for a fresh roster push.
    RequestPeers,
    /// Ask the server to dispose the room.
    DisposeRoom,
    /// Close the connection and end the session.
    Logout,
}

/// Cloneable handle for issuing commands to a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<Command>,
}

impl SessionHandle {
    /// Send a chat message. Returns `false` if the session has ended.
    pub async fn send_chat(&self, text: impl Into<String>) -> bool {
        self.tx.send(Command::SendChat(text.into())).await.is_ok()
    }

    /// Signal that the local user is typing.
    pub async fn typing(&self) -> bool {
        self.tx.send(Command::Typing).await.is_ok()
    }

    /// Request a fresh roster push.
    pub async fn request_peers(&self) -> bool {
        self.tx.send(Command::RequestPeers).await.is_ok()
    }

    /// Ask the server to dispose the room.
    pub async fn dispose_room(&self) -> bool {
        self.tx.send(Command::DisposeRoom).await.is_ok()
    }

    /// Log out: close the connection and end the session.
    pub async fn logout(&self) -> bool {
        self.tx.send(Command::Logout).await.is_ok()
    }
}

/// Final outcome of a session run.
#[derive(Debug)]
pub struct SessionEnd {
    pub reason: EndReason,
    /// The state as it stood when the session ended.
    pub state: SessionState,
}

/// A room session: one logical connection to one room, with transparent
/// reconnection.
pub struct Session {
    config: SessionConfig,
    connector: Box<dyn Connector>,
    dispatcher: Dispatcher<SessionState>,
    outbox: Outbox,
    state: SessionState,
    gate: TypingGate,
    supervisor: Supervisor,
    commands: mpsc::Receiver<Command>,
    pending_reconnect: Option<Duration>,
}

impl Session {
    /// Create a session and its command handle.
    ///
    /// The reconciler is subscribed to every known event type; additional
    /// observers can be attached with [`subscribe`](Session::subscribe)
    /// before the session runs.
    #[must_use]
    pub fn new(connector: Box<dyn Connector>, config: SessionConfig) -> (Self, SessionHandle) {
        let (tx, rx) = mpsc::channel(config.command_buffer);

        let mut dispatcher = Dispatcher::new();
        reconcile::register(&mut dispatcher);

        let session = Self {
            gate: TypingGate::new(config.typing_debounce),
            supervisor: Supervisor::new(config.reconnect_interval),
            config,
            connector,
            dispatcher,
            outbox: Outbox::new(),
            state: SessionState::new(),
            commands: rx,
            pending_reconnect: None,
        };

        (session, SessionHandle { tx })
    }

    /// Register an additional observer for an event type, invoked after the
    /// reconciler has applied the event.
    pub fn subscribe(
        &mut self,
        tag: EventType,
        handler: impl FnMut(&mut SessionState, &mut Outbox, &Event) + Send + 'static,
    ) {
        self.dispatcher.subscribe(tag, handler);
    }

    /// The current state. Mostly useful before `run`; afterwards the state
    /// comes back in [`SessionEnd`].
    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Run the session to completion.
    ///
    /// Connects to `url`, applies inbound events, reconnects on unexpected
    /// loss, and returns when the session ends: server-side policy
    /// termination, a normal close, or a local logout.
    pub async fn run(mut self, url: &str) -> SessionEnd {
        let mut conn: Option<Box<dyn Connection>> = None;
        let mut sweep = interval(self.config.typing_debounce);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.supervisor.begin_connect();

        loop {
            match self.supervisor.phase() {
                ConnPhase::Connecting => match self.connector.connect(url).await {
                    Ok(c) => {
                        conn = Some(c);
                        let event = self.supervisor.on_opened();
                        self.apply(&event);
                        self.flush(conn.as_mut()).await;
                    }
                    Err(e) => {
                        warn!("Connect attempt failed: {}", e);
                        let t = self.supervisor.on_connect_failed();
                        self.execute(t);
                    }
                },

                ConnPhase::Connected => {
                    let Some(c) = conn.as_mut() else {
                        // Unreachable by construction; restart the attempt.
                        self.supervisor.begin_connect();
                        continue;
                    };

                    let tick = tokio::select! {
                        res = c.recv() => Tick::Inbound(res),
                        cmd = self.commands.recv() => Tick::Cmd(cmd),
                        _ = sweep.tick() => Tick::Sweep,
                    };

                    match tick {
                        Tick::Inbound(Ok(Some(event))) => {
                            self.apply(&event);
                            self.flush(conn.as_mut()).await;
                        }
                        Tick::Inbound(Ok(None)) => {
                            let info = conn
                                .as_ref()
                                .and_then(|c| c.close_info().cloned())
                                .unwrap_or_else(CloseInfo::abnormal);
                            conn = None;
                            let t = self.supervisor.on_closed(info.code, &info.reason);
                            self.execute(t);
                        }
                        Tick::Inbound(Err(e)) => {
                            debug!("Receive failed: {}", e);
                            conn = None;
                            let t = self.supervisor.on_closed(ABNORMAL_CLOSE_CODE, "");
                            self.execute(t);
                        }
                        Tick::Cmd(Some(cmd)) => {
                            self.handle_command(cmd, &mut conn).await;
                        }
                        Tick::Cmd(None) => {
                            // Every handle dropped; treat as logout.
                            self.logout(&mut conn).await;
                        }
                        Tick::Sweep => {
                            let evicted = self
                                .state
                                .typing
                                .sweep(Instant::now(), self.config.typing_debounce);
                            if !evicted.is_empty() {
                                trace!(count = evicted.len(), "Swept stale typing entries");
                            }
                        }
                    }
                }

                ConnPhase::Disconnected => {
                    let wait = self
                        .pending_reconnect
                        .take()
                        .unwrap_or(self.config.reconnect_interval);

                    // The one pending reconnect timer. A logout cancels it.
                    let timer = sleep(wait);
                    tokio::pin!(timer);

                    let reconnect = loop {
                        tokio::select! {
                            () = &mut timer => break true,
                            cmd = self.commands.recv() => match cmd {
                                Some(Command::Logout) | None => break false,
                                Some(cmd) => {
                                    debug!(?cmd, "Dropping command while disconnected");
                                }
                            }
                        }
                    };

                    if reconnect {
                        self.supervisor.begin_connect();
                    } else {
                        self.logout(&mut conn).await;
                    }
                }

                ConnPhase::Idle | ConnPhase::Disposed => break,
            }
        }

        let reason = match self.state.phase {
            SessionPhase::Ended(reason) => reason,
            _ => EndReason::ConnectionClosed,
        };

        SessionEnd {
            reason,
            state: self.state,
        }
    }

    fn apply(&mut self, event: &Event) {
        trace!(event = %event.event_type(), "Applying event");
        self.dispatcher
            .publish(&mut self.state, &mut self.outbox, event);
    }

    /// Apply a supervisor transition: publish its events and note any
    /// reconnect to schedule.
    fn execute(&mut self, transition: Transition) {
        for event in &transition.events {
            self.apply(event);
        }
        if let Directive::Reconnect(wait) = transition.directive {
            self.pending_reconnect = Some(wait);
        }
    }

    async fn handle_command(&mut self, cmd: Command, conn: &mut Option<Box<dyn Connection>>) {
        match cmd {
            Command::SendChat(text) => {
                // No trailing typing signal after a send.
                self.gate.cancel();
                self.outbox.push(Request::message(text));
            }
            Command::Typing => {
                if self.gate.try_signal(Instant::now()) {
                    self.outbox.push(Request::Typing);
                } else {
                    trace!("Typing signal suppressed by debounce");
                }
            }
            Command::RequestPeers => self.outbox.push(Request::PeerList),
            Command::DisposeRoom => self.outbox.push(Request::RoomDispose),
            Command::Logout => {
                self.logout(conn).await;
                return;
            }
        }
        self.flush(conn.as_mut()).await;
    }

    async fn logout(&mut self, conn: &mut Option<Box<dyn Connection>>) {
        if let Some(mut c) = conn.take() {
            c.close(NORMAL_CLOSE_CODE, "logout").await;
        }
        self.supervisor.on_local_close();
        self.state.phase = SessionPhase::Ended(EndReason::LoggedOut);
    }

    /// Flush queued outbound requests to the live connection.
    ///
    /// With no connection the queue is discarded: the UI already reflects
    /// the disconnected state, so the caller is not notified.
    async fn flush(&mut self, conn: Option<&mut Box<dyn Connection>>) {
        if self.outbox.is_empty() {
            return;
        }

        let Some(conn) = conn else {
            debug!(
                dropped = self.outbox.len(),
                "Discarding outbound requests; no connection"
            );
            self.outbox.clear();
            return;
        };

        let queued: Vec<Request> = self.outbox.drain().collect();
        for request in queued {
            if let Err(e) = conn.send(&request).await {
                debug!("Outbound send discarded: {}", e);
            }
        }
    }
}

enum Tick {
    Inbound(Result<Option<Event>, TransportError>),
    Cmd(Option<Command>),
    Sweep,
}
