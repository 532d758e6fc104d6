//! Typed event dispatch.
//!
//! Inbound events are demultiplexed by their [`EventType`] tag into ordered
//! per-type handler lists. The tag set is closed, so a subscription cannot
//! silently miss due to a misspelled string. Delivery is synchronous and in
//! arrival order; a handler runs to completion before the next event is
//! processed.
//!
//! Handlers never touch the socket directly: outbound requests go onto the
//! [`Outbox`], which the session loop flushes to the live connection. That
//! queue is the only send path in the client.

use confab_protocol::{Event, EventType, Request};
use std::collections::{HashMap, VecDeque};
use tracing::trace;

/// A subscribed event handler.
pub type Handler<S> = Box<dyn FnMut(&mut S, &mut Outbox, &Event) + Send>;

/// Queue of outbound requests awaiting flush to the transport.
#[derive(Debug, Default)]
pub struct Outbox {
    queue: VecDeque<Request>,
}

impl Outbox {
    /// Create an empty outbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a request for sending.
    pub fn push(&mut self, request: Request) {
        self.queue.push_back(request);
    }

    /// Drain all queued requests in FIFO order.
    pub fn drain(&mut self) -> impl Iterator<Item = Request> + '_ {
        self.queue.drain(..)
    }

    /// Discard all queued requests.
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Number of queued requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if the outbox is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// The event dispatcher.
///
/// Generic over the state type so it can be exercised against a bare test
/// state as well as the real [`crate::state::SessionState`].
pub struct Dispatcher<S> {
    handlers: HashMap<EventType, Vec<Handler<S>>>,
}

impl<S> Dispatcher<S> {
    /// Create a dispatcher with no subscriptions.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for an event type.
    ///
    /// Multiple handlers per type are allowed and invoked in registration
    /// order.
    pub fn subscribe(
        &mut self,
        tag: EventType,
        handler: impl FnMut(&mut S, &mut Outbox, &Event) + Send + 'static,
    ) {
        self.handlers
            .entry(tag)
            .or_default()
            .push(Box::new(handler));
    }

    /// Number of handlers registered for a type.
    #[must_use]
    pub fn handler_count(&self, tag: EventType) -> usize {
        self.handlers.get(&tag).map_or(0, Vec::len)
    }

    /// Deliver an event to every handler subscribed to its type.
    ///
    /// Types with no subscribers are dropped without error. Returns the
    /// number of handlers invoked.
    pub fn publish(&mut self, state: &mut S, outbox: &mut Outbox, event: &Event) -> usize {
        let tag = event.event_type();

        let Some(handlers) = self.handlers.get_mut(&tag) else {
            trace!(event = %tag, "No subscribers; event dropped");
            return 0;
        };

        for handler in handlers.iter_mut() {
            handler(state, outbox, event);
        }

        handlers.len()
    }
}

impl<S> Default for Dispatcher<S> {
    fn default() -> Self {
        Self::new()
    }
}
