//! Outbound typing-signal debounce.
//!
//! A local keystroke produces at most one `typing` signal per debounce
//! window. Sending a chat message cancels the window so no trailing typing
//! signal follows a send, and the next keystroke signals immediately.

use std::time::{Duration, Instant};

/// Default spacing between outbound typing signals.
pub const DEFAULT_TYPING_DEBOUNCE: Duration = Duration::from_millis(3000);

/// Rate gate for outbound typing signals.
#[derive(Debug, Clone)]
pub struct TypingGate {
    interval: Duration,
    window_until: Option<Instant>,
}

impl TypingGate {
    /// Create a gate with the given debounce interval.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            window_until: None,
        }
    }

    /// The configured debounce interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Record a local typing trigger.
    ///
    /// Returns `true` if a signal should be sent now (and opens a new
    /// debounce window); `false` while a window is pending.
    pub fn try_signal(&mut self, now: Instant) -> bool {
        if self.window_until.is_some_and(|until| now < until) {
            return false;
        }
        self.window_until = Some(now + self.interval);
        true
    }

    /// Cancel any pending debounce window (on chat send).
    pub fn cancel(&mut self) {
        self.window_until = None;
    }
}

impl Default for TypingGate {
    fn default() -> Self {
        Self::new(DEFAULT_TYPING_DEBOUNCE)
    }
}
