//! Connection and identity record for one client session.
//!
//! SYSTEM CONTEXT
//! ==============
//! One `Session` exists per launch. The identity is fixed at construction;
//! connection state and the active room move as the reducer processes
//! operations and inbound events.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

/// Transport connection lifecycle state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Clone, Debug)]
pub struct Session {
    identity: String,
    pub connection: ConnectionState,
    /// Room used to filter inbound events and tag outbound ones.
    pub active_room: Option<String>,
    /// True once the server acknowledged `authenticate` on this connection.
    pub authenticated: bool,
    /// True once `join_room` for `active_room` was sent on this connection.
    pub joined: bool,
}

impl Session {
    #[must_use]
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            connection: ConnectionState::Disconnected,
            active_room: None,
            authenticated: false,
            joined: false,
        }
    }

    /// Username this session authenticates as.
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }

    #[must_use]
    pub fn is_active_room(&self, room: &str) -> bool {
        self.active_room.as_deref() == Some(room)
    }
}

/// Derive the room named by a navigation path.
///
/// Recognizes `/chat_room/<room>` and `/chat/<room>`; query strings and
/// fragments are ignored.
#[must_use]
pub fn room_from_path(path: &str) -> Option<String> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    while let Some(segment) = segments.next() {
        if segment == "chat_room" || segment == "chat" {
            return segments.next().map(ToOwned::to_owned);
        }
    }
    None
}
