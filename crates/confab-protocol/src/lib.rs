//! # confab-protocol
//!
//! Wire protocol definitions for the confab realtime chat client.
//!
//! This crate defines the JSON envelope exchanged with a room-scoped chat
//! server, including the closed set of event type tags, inbound event
//! payloads, outbound request frames, and close-code classification.
//!
//! ## Envelope
//!
//! Every frame is a JSON object `{"type": <tag>, "timestamp": <epoch-ms>,
//! "data": <payload>}`. The `connect`, `disconnect`, and `reconnecting` tags
//! are synthesized locally by the client and never arrive over the wire.
//!
//! ## Example
//!
//! ```rust
//! use confab_protocol::{codec, Event, Request};
//!
//! // Encode an outbound chat message
//! let encoded = codec::encode(&Request::message("Hello, room!")).unwrap();
//!
//! // Decode an inbound event
//! let event = codec::decode(r#"{"type":"notice","timestamp":0,"data":"hi"}"#).unwrap();
//! assert!(matches!(event, Event::Notice { .. }));
//! ```

pub mod close;
pub mod codec;
pub mod events;

pub use close::{classify, CloseClass, ABNORMAL_CLOSE_CODE, NORMAL_CLOSE_CODE};
pub use codec::{decode, encode, ProtocolError};
pub use events::{ChatPayload, Event, EventType, Peer, Request};
