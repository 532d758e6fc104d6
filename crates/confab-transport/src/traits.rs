//! Transport abstraction traits for confab.
//!
//! These traits define the interface a transport implementation must
//! provide, allowing the session core to be transport-agnostic (and to be
//! tested against scripted in-memory connections).

use async_trait::async_trait;
use confab_protocol::close::ABNORMAL_CLOSE_CODE;
use confab_protocol::{Event, Request};
use thiserror::Error;

/// How a connection ended: the close code and the server's reason string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    /// Websocket close code. Synthetic 1006 when no close frame arrived.
    pub code: u16,
    /// Reason text; may carry a terminal policy tag.
    pub reason: String,
}

impl CloseInfo {
    /// Create a new close record.
    #[must_use]
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Close record for a connection lost without a close frame.
    #[must_use]
    pub fn abnormal() -> Self {
        Self::new(ABNORMAL_CLOSE_CODE, "")
    }
}

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Failed to establish a connection.
    #[error("Connect failed: {0}")]
    ConnectFailed(String),

    /// Failed to send data.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Failed to receive data.
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// The connect URL could not be built or parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A transport that can dial a room server.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a new connection to the given URL.
    ///
    /// Each call produces an independent connection; the caller owns at most
    /// one live connection at a time and must close the previous one first
    /// if a clean shutdown is desired.
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>, TransportError>;

    /// Get the transport name (e.g., "websocket").
    fn name(&self) -> &'static str;
}

/// An active connection to a room server.
#[async_trait]
pub trait Connection: Send {
    /// Receive the next decoded event from the connection.
    ///
    /// Returns `None` when the connection has closed; [`close_info`] then
    /// reports how. Undecodable frames are dropped here, not surfaced: a
    /// malformed frame must never tear down the connection.
    ///
    /// [`close_info`]: Connection::close_info
    async fn recv(&mut self) -> Result<Option<Event>, TransportError>;

    /// Send a request frame.
    ///
    /// A send on a closing or closed connection is a silent no-op — callers
    /// do not need to guard for this condition.
    async fn send(&mut self, request: &Request) -> Result<(), TransportError>;

    /// Close the connection gracefully with the given code and reason.
    async fn close(&mut self, code: u16, reason: &str);

    /// How the connection ended, once it has.
    fn close_info(&self) -> Option<&CloseInfo>;

    /// Check if the connection is still open.
    fn is_open(&self) -> bool;
}
