//! # confab-transport
//!
//! Client-side transport layer for the confab chat client.
//!
//! The [`Connector`] and [`Connection`] traits keep the session core
//! protocol-agnostic; the shipped implementation dials a room server over
//! WebSocket with tokio-tungstenite.
//!
//! ```rust,ignore
//! use confab_transport::{Connector, WebSocketConnector};
//!
//! let connector = WebSocketConnector::default();
//! let mut conn = connector.connect("ws://localhost:8080/ws/lobby").await?;
//! while let Some(event) = conn.recv().await? {
//!     // Process event
//! }
//! ```

pub mod traits;
pub mod url;
pub mod websocket;

pub use traits::{CloseInfo, Connection, Connector, TransportError};
pub use url::room_url;
pub use websocket::{WebSocketConnection, WebSocketConnector};
