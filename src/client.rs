//! Live session client: the reducer at the center of the crate.
//!
//! DESIGN
//! ======
//! `LiveSession` owns every piece of client state (session, membership,
//! typing). Operations and inbound events mutate it and return a list of
//! `Effect`s; nothing here touches the network or the terminal. The
//! transport layer applies effects: it opens sockets, emits outbound
//! events, and forwards `Patch`es to whatever renders the view.
//!
//! All inbound handling is idempotent per username or room: repeating an
//! event yields no duplicate membership entries and no duplicate patches.
//!
//! LIFECYCLE
//! =========
//! 1. `connect()` → `Connecting`, `Effect::Open`
//! 2. transport `connect` → `Connected`, emit `authenticate`
//! 3. `authenticated` → emit `join_room` for the held room
//! 4. room events → patches
//! 5. transport `disconnect` → `Disconnected`; the transport reconnects

#[cfg(test)]
#[path = "client_test.rs"]
mod client_test;

use std::time::{Duration, Instant};

use events::{ChatMessage, InboundEvent, OutboundEvent, UserStatus};
use tracing::{debug, info, warn};

use crate::state::chat::{ChatMessageView, joined_notice, left_notice};
use crate::state::membership::RoomMembership;
use crate::state::session::{ConnectionState, Session, room_from_path};
use crate::state::typing::{RemoteTypists, TypingDebounce};

// =============================================================================
// EFFECTS
// =============================================================================

/// Instruction produced by the reducer for the transport layer.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Open the transport. Produced at most once per disconnected period.
    Open,
    /// Send an event to the server.
    Emit(OutboundEvent),
    /// Update the rendered view.
    Patch(Patch),
}

/// View mutation. Applying the same patch twice is harmless.
#[derive(Clone, Debug, PartialEq)]
pub enum Patch {
    Connection(ConnectionState),
    /// The room context changed; drop messages, members and typists.
    ClearRoom { room: Option<String> },
    AppendMessage(ChatMessageView),
    AppendNotice(String),
    AddMember { username: String, is_self: bool },
    RemoveMember { username: String },
    /// Typing indicator text, `None` to hide it.
    TypingIndicator(Option<String>),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("not connected")]
    NotConnected,
    #[error("no active room")]
    NoActiveRoom,
    #[error("message is empty")]
    EmptyMessage,
}

// =============================================================================
// SESSION
// =============================================================================

#[derive(Clone, Debug)]
pub struct LiveSession {
    session: Session,
    members: RoomMembership,
    typists: RemoteTypists,
    local_typing: TypingDebounce,
}

impl LiveSession {
    #[must_use]
    pub fn new(identity: impl Into<String>, typing_idle: Duration) -> Self {
        Self {
            session: Session::new(identity),
            members: RoomMembership::default(),
            typists: RemoteTypists::default(),
            local_typing: TypingDebounce::new(typing_idle),
        }
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn members(&self) -> &RoomMembership {
        &self.members
    }

    #[must_use]
    pub fn typing_label(&self) -> Option<String> {
        self.typists.label()
    }

    /// When the local stop-typing signal is due, if a burst is in progress.
    #[must_use]
    pub fn typing_deadline(&self) -> Option<Instant> {
        self.local_typing.deadline()
    }

    // -------------------------------------------------------------------------
    // Operations
    // -------------------------------------------------------------------------

    /// Request a connection. No-op unless disconnected.
    pub fn connect(&mut self) -> Vec<Effect> {
        if self.session.connection != ConnectionState::Disconnected {
            debug!(state = ?self.session.connection, "session: connect ignored");
            return Vec::new();
        }
        self.session.connection = ConnectionState::Connecting;
        vec![Effect::Patch(Patch::Connection(ConnectionState::Connecting)), Effect::Open]
    }

    /// Make `room` the active room.
    ///
    /// The `join_room` action waits for authentication; switching rooms
    /// leaves the previous one and clears room-scoped state.
    pub fn join_room(&mut self, room: &str) -> Vec<Effect> {
        let room = room.trim();
        if room.is_empty() {
            return self.leave_room();
        }
        if self.session.is_active_room(room) {
            return self.join_if_ready();
        }

        let mut effects = self.exit_current_room();
        self.session.active_room = Some(room.to_owned());
        effects.push(Effect::Patch(Patch::ClearRoom { room: Some(room.to_owned()) }));
        effects.extend(self.join_if_ready());
        effects
    }

    /// Leave the active room, if any.
    pub fn leave_room(&mut self) -> Vec<Effect> {
        if self.session.active_room.is_none() {
            return Vec::new();
        }
        let mut effects = self.exit_current_room();
        self.session.active_room = None;
        effects.push(Effect::Patch(Patch::ClearRoom { room: None }));
        effects
    }

    /// Re-derive the room from a navigation path.
    pub fn navigate(&mut self, path: &str) -> Vec<Effect> {
        match room_from_path(path) {
            Some(room) => self.join_room(&room),
            None => self.leave_room(),
        }
    }

    /// Send a chat message to the active room.
    ///
    /// There is no local echo; the server broadcasts the message back to
    /// the whole room, sender included. Submitting ends any typing burst.
    pub fn send_message(&mut self, text: &str) -> Result<Vec<Effect>, SessionError> {
        if !self.session.is_connected() {
            warn!("session: cannot send message, not connected");
            return Err(SessionError::NotConnected);
        }
        let Some(room) = self.session.active_room.clone() else {
            return Err(SessionError::NoActiveRoom);
        };
        if text.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        let mut effects = Vec::new();
        if self.local_typing.cancel() {
            effects.extend(self.emit_typing(false));
        }
        effects.push(Effect::Emit(OutboundEvent::NewMessage { room, message: text.to_owned() }));
        Ok(effects)
    }

    /// Explicit typing state from the input widget.
    ///
    /// `true` behaves like a keystroke at `now`: it starts a burst or extends
    /// the current one. `false` ends the burst early and emits a stop only if
    /// one was in progress.
    pub fn set_typing(&mut self, typing: bool, now: Instant) -> Vec<Effect> {
        if typing {
            return self.keystroke(now);
        }
        if self.local_typing.cancel() {
            return self.emit_typing(false);
        }
        Vec::new()
    }

    /// Local keystroke at `now`: start a typing burst or extend the current one.
    pub fn keystroke(&mut self, now: Instant) -> Vec<Effect> {
        let mut effects = self.poll_typing(now);
        if !self.session.is_connected() || self.session.active_room.is_none() {
            return effects;
        }
        if self.local_typing.keystroke(now) {
            effects.extend(self.emit_typing(true));
        }
        effects
    }

    /// Emit `typing=false` once the inactivity window has elapsed.
    pub fn poll_typing(&mut self, now: Instant) -> Vec<Effect> {
        if self.local_typing.poll(now) {
            return self.emit_typing(false);
        }
        Vec::new()
    }

    // -------------------------------------------------------------------------
    // Inbound events
    // -------------------------------------------------------------------------

    /// Apply one inbound event.
    pub fn apply(&mut self, event: InboundEvent) -> Vec<Effect> {
        match event {
            InboundEvent::Connect => self.on_connect(),
            InboundEvent::Disconnect => self.on_disconnect(),
            InboundEvent::Error { message } => {
                warn!(%message, "session: server error");
                Vec::new()
            }
            InboundEvent::Authenticated { username } => self.on_authenticated(&username),
            InboundEvent::ChatMessage(msg) => self.on_message(msg),
            InboundEvent::UserJoined { room, username } => self.on_user_joined(&room, &username),
            InboundEvent::UserLeft { room, username } => self.on_user_left(&room, &username),
            InboundEvent::UserTyping { room, username, typing } => {
                self.on_typing(&room, &username, typing)
            }
            InboundEvent::UserStatus { username, status } => self.on_user_status(&username, status),
            InboundEvent::Unknown { name } => {
                debug!(%name, "session: ignoring unknown event");
                Vec::new()
            }
        }
    }

    fn on_connect(&mut self) -> Vec<Effect> {
        if self.session.is_connected() {
            return Vec::new();
        }
        info!(username = %self.session.identity(), "session: connected");
        self.session.connection = ConnectionState::Connected;
        self.session.authenticated = false;
        self.session.joined = false;
        vec![
            Effect::Patch(Patch::Connection(ConnectionState::Connected)),
            Effect::Emit(OutboundEvent::Authenticate { username: self.session.identity().to_owned() }),
        ]
    }

    fn on_disconnect(&mut self) -> Vec<Effect> {
        if self.session.connection == ConnectionState::Disconnected {
            return Vec::new();
        }
        info!("session: disconnected");
        self.session.connection = ConnectionState::Disconnected;
        self.session.authenticated = false;
        self.session.joined = false;
        self.local_typing.cancel();

        let mut effects = vec![Effect::Patch(Patch::Connection(ConnectionState::Disconnected))];
        if !self.typists.is_empty() {
            self.typists.clear();
            effects.push(Effect::Patch(Patch::TypingIndicator(None)));
        }
        effects
    }

    fn on_authenticated(&mut self, username: &str) -> Vec<Effect> {
        if username != self.session.identity() {
            warn!(%username, identity = %self.session.identity(), "session: authenticated under a different name");
        }
        info!(%username, "session: authenticated");
        self.session.authenticated = true;
        self.join_if_ready()
    }

    fn on_message(&mut self, msg: ChatMessage) -> Vec<Effect> {
        if !self.session.is_active_room(&msg.room) {
            return Vec::new();
        }
        let is_own = msg.username == self.session.identity();
        vec![Effect::Patch(Patch::AppendMessage(ChatMessageView {
            username: msg.username,
            text: msg.message,
            timestamp: msg.timestamp,
            sentiment: msg.sentiment,
            is_own,
        }))]
    }

    fn on_user_joined(&mut self, room: &str, username: &str) -> Vec<Effect> {
        if !self.session.is_active_room(room) {
            return Vec::new();
        }
        let mut effects = vec![Effect::Patch(Patch::AppendNotice(joined_notice(username)))];
        effects.extend(self.add_member(username));
        effects
    }

    fn on_user_left(&mut self, room: &str, username: &str) -> Vec<Effect> {
        if !self.session.is_active_room(room) {
            return Vec::new();
        }
        let mut effects = vec![Effect::Patch(Patch::AppendNotice(left_notice(username)))];
        effects.extend(self.remove_member(username));
        effects
    }

    fn on_typing(&mut self, room: &str, username: &str, typing: bool) -> Vec<Effect> {
        if !self.session.is_active_room(room) || username == self.session.identity() {
            return Vec::new();
        }
        if self.typists.set(username, typing) {
            return vec![Effect::Patch(Patch::TypingIndicator(self.typists.label()))];
        }
        Vec::new()
    }

    fn on_user_status(&mut self, username: &str, status: UserStatus) -> Vec<Effect> {
        match status {
            UserStatus::Online => self.add_member(username),
            UserStatus::Offline => self.remove_member(username),
        }
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn add_member(&mut self, username: &str) -> Vec<Effect> {
        if !self.members.insert(username) {
            return Vec::new();
        }
        vec![Effect::Patch(Patch::AddMember {
            username: username.to_owned(),
            is_self: username == self.session.identity(),
        })]
    }

    fn remove_member(&mut self, username: &str) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.members.remove(username) {
            effects.push(Effect::Patch(Patch::RemoveMember { username: username.to_owned() }));
        }
        if self.typists.remove(username) {
            effects.push(Effect::Patch(Patch::TypingIndicator(self.typists.label())));
        }
        effects
    }

    fn join_if_ready(&mut self) -> Vec<Effect> {
        if !self.session.is_connected() || !self.session.authenticated || self.session.joined {
            return Vec::new();
        }
        let Some(room) = self.session.active_room.clone() else {
            return Vec::new();
        };
        info!(%room, "session: joining room");
        self.session.joined = true;
        vec![Effect::Emit(OutboundEvent::JoinRoom { room })]
    }

    /// Raw `typing` emit. Suppressed without a connection or room.
    fn emit_typing(&self, typing: bool) -> Vec<Effect> {
        if !self.session.is_connected() {
            return Vec::new();
        }
        let Some(room) = self.session.active_room.clone() else {
            return Vec::new();
        };
        vec![Effect::Emit(OutboundEvent::Typing { room, typing })]
    }

    /// Stop typing in and leave the current room; clear room-scoped state.
    fn exit_current_room(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.local_typing.cancel() {
            effects.extend(self.emit_typing(false));
        }
        if let Some(room) = self.session.active_room.clone() {
            if self.session.joined && self.session.is_connected() {
                info!(%room, "session: leaving room");
                effects.push(Effect::Emit(OutboundEvent::LeaveRoom { room }));
            }
        }
        self.session.joined = false;
        self.members.clear();
        self.typists.clear();
        effects
    }
}
