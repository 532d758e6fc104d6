//! # confab-core
//!
//! Session state machine for the confab realtime chat client.
//!
//! This crate provides the fundamental building blocks:
//!
//! - **Dispatcher** - Closed-set pub/sub delivery of typed events
//! - **SessionState** - Self identity, peer roster, timeline, typing set
//! - **Reconciler** - Merge rules applying inbound events to the state
//! - **TypingGate** - Outbound typing-signal debounce
//! - **Supervisor** - Connection lifecycle and reconnect scheduling
//! - **Session** - The single event loop that drives all of the above
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────┐
//! │  Connection │────▶│ Supervisor  │────▶│  Dispatcher  │
//! └─────────────┘     └─────────────┘     └──────────────┘
//!                                                │
//!                                                ▼
//!                     ┌─────────────┐     ┌──────────────┐
//!                     │ TypingGate  │     │ SessionState │
//!                     └─────────────┘     └──────────────┘
//! ```
//!
//! All mutation happens on the session loop: on delivery of a dispatched
//! event, on a command from a [`SessionHandle`], or on a timer tick. There is
//! no parallel execution of core logic and no reentrancy.

pub mod dispatcher;
pub mod reconcile;
pub mod session;
pub mod state;
pub mod supervisor;
pub mod typing;

pub use dispatcher::{Dispatcher, Outbox};
pub use session::{Command, Session, SessionConfig, SessionEnd, SessionHandle};
pub use state::{EndReason, Roster, SessionPhase, SessionState, TimelineEntry, TypingSet};
pub use supervisor::{ConnPhase, Directive, Supervisor, Transition};
pub use typing::TypingGate;
