//! Typing indicators: remote typists and the local stop-typing debounce.
//!
//! DESIGN
//! ======
//! Remote typing is a username-keyed set ordered by when each user started
//! typing, so the indicator can name the earliest typist and count the rest.
//!
//! The local debounce holds a single deadline instead of a timer handle. A
//! keystroke re-arms it (cancel-and-reschedule); the owner polls it with the
//! current time. Callers pass `now` explicitly so the logic runs the same
//! under tokio's clock and in plain unit tests.

#[cfg(test)]
#[path = "typing_test.rs"]
mod typing_test;

use std::time::{Duration, Instant};

/// Remote users currently typing in the active room.
#[derive(Clone, Debug, Default)]
pub struct RemoteTypists {
    typists: Vec<String>,
}

impl RemoteTypists {
    /// Record a typing flag. Returns `true` when the set changed.
    pub fn set(&mut self, username: &str, typing: bool) -> bool {
        if typing {
            if self.typists.iter().any(|t| t == username) {
                return false;
            }
            self.typists.push(username.to_owned());
            true
        } else {
            self.remove(username)
        }
    }

    /// Forget `username`. Returns `true` when the set changed.
    pub fn remove(&mut self, username: &str) -> bool {
        let before = self.typists.len();
        self.typists.retain(|t| t != username);
        self.typists.len() != before
    }

    pub fn clear(&mut self) {
        self.typists.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.typists.is_empty()
    }

    /// Indicator text, or `None` when the indicator should be hidden.
    #[must_use]
    pub fn label(&self) -> Option<String> {
        let (first, rest) = self.typists.split_first()?;
        Some(match rest.len() {
            0 => format!("{first} is typing..."),
            1 => format!("{first} and 1 other are typing..."),
            n => format!("{first} and {n} others are typing..."),
        })
    }
}

/// Debounce for the local user's outbound typing signal.
#[derive(Clone, Debug)]
pub struct TypingDebounce {
    idle: Duration,
    deadline: Option<Instant>,
}

impl TypingDebounce {
    #[must_use]
    pub fn new(idle: Duration) -> Self {
        Self { idle, deadline: None }
    }

    /// Register a keystroke at `now`.
    ///
    /// Returns `true` when this keystroke starts a burst, i.e. the caller
    /// should send `typing=true`. Either way the stop deadline moves to
    /// `now + idle`.
    pub fn keystroke(&mut self, now: Instant) -> bool {
        let starts_burst = self.deadline.is_none();
        self.deadline = Some(now + self.idle);
        starts_burst
    }

    /// Returns `true` exactly once per burst, when `now` reaches the deadline.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Drop the pending stop. Returns `true` if a burst was in progress.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.deadline.is_some()
    }
}
