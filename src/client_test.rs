use super::*;

const IDLE: Duration = Duration::from_millis(2000);

fn session() -> LiveSession {
    LiveSession::new("ann", IDLE)
}

/// Connected, authenticated, and joined to `lobby`.
fn joined() -> LiveSession {
    let mut s = session();
    s.connect();
    s.apply(InboundEvent::Connect);
    s.apply(InboundEvent::Authenticated { username: "ann".to_owned() });
    s.join_room("lobby");
    s
}

fn emitted(effects: &[Effect]) -> Vec<OutboundEvent> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::Emit(event) => Some(event.clone()),
            _ => None,
        })
        .collect()
}

fn typing(room: &str, flag: bool) -> OutboundEvent {
    OutboundEvent::Typing { room: room.to_owned(), typing: flag }
}

fn joined_event(room: &str, username: &str) -> InboundEvent {
    InboundEvent::UserJoined { room: room.to_owned(), username: username.to_owned() }
}

fn left_event(room: &str, username: &str) -> InboundEvent {
    InboundEvent::UserLeft { room: room.to_owned(), username: username.to_owned() }
}

fn typing_event(username: &str, flag: bool) -> InboundEvent {
    InboundEvent::UserTyping { room: "lobby".to_owned(), username: username.to_owned(), typing: flag }
}

fn chat(room: &str, username: &str, sentiment: Option<f64>) -> InboundEvent {
    InboundEvent::ChatMessage(ChatMessage {
        room: room.to_owned(),
        username: username.to_owned(),
        message: "hello".to_owned(),
        timestamp: Some("2024-01-01 10:00:00".to_owned()),
        sentiment,
    })
}

// =============================================================
// Connection lifecycle
// =============================================================

#[test]
fn connect_twice_opens_one_connection() {
    let mut s = session();
    let first = s.connect();
    assert_eq!(
        first,
        vec![Effect::Patch(Patch::Connection(ConnectionState::Connecting)), Effect::Open]
    );
    assert!(s.connect().is_empty());

    s.apply(InboundEvent::Connect);
    assert!(s.connect().is_empty());
    assert_eq!(s.session().connection, ConnectionState::Connected);
}

#[test]
fn transport_connect_sends_authenticate() {
    let mut s = session();
    s.connect();
    let effects = s.apply(InboundEvent::Connect);
    assert_eq!(
        effects,
        vec![
            Effect::Patch(Patch::Connection(ConnectionState::Connected)),
            Effect::Emit(OutboundEvent::Authenticate { username: "ann".to_owned() }),
        ]
    );
    assert!(s.apply(InboundEvent::Connect).is_empty());
}

#[test]
fn join_room_waits_for_authentication() {
    let mut s = session();
    s.connect();
    s.apply(InboundEvent::Connect);

    let effects = s.join_room("lobby");
    assert!(emitted(&effects).is_empty());
    assert_eq!(s.session().active_room.as_deref(), Some("lobby"));

    let effects = s.apply(InboundEvent::Authenticated { username: "ann".to_owned() });
    assert_eq!(emitted(&effects), vec![OutboundEvent::JoinRoom { room: "lobby".to_owned() }]);
}

#[test]
fn joining_active_room_again_is_noop() {
    let mut s = joined();
    assert!(s.join_room("lobby").is_empty());
}

#[test]
fn switching_rooms_leaves_previous_and_clears_membership() {
    let mut s = joined();
    s.apply(joined_event("lobby", "bob"));
    assert_eq!(s.members().len(), 1);

    let effects = s.join_room("rust");
    assert_eq!(
        emitted(&effects),
        vec![
            OutboundEvent::LeaveRoom { room: "lobby".to_owned() },
            OutboundEvent::JoinRoom { room: "rust".to_owned() },
        ]
    );
    assert!(effects.contains(&Effect::Patch(Patch::ClearRoom { room: Some("rust".to_owned()) })));
    assert!(s.members().is_empty());
}

#[test]
fn switching_rooms_mid_burst_stops_typing_in_old_room() {
    let mut s = joined();
    s.keystroke(Instant::now());
    let effects = s.join_room("rust");
    assert_eq!(emitted(&effects)[0], typing("lobby", false));
    assert_eq!(s.typing_deadline(), None);
}

#[test]
fn navigate_rederives_room_from_path() {
    let mut s = joined();
    let effects = s.navigate("/chat_room/rust");
    assert!(emitted(&effects).contains(&OutboundEvent::JoinRoom { room: "rust".to_owned() }));

    let effects = s.navigate("/profile");
    assert_eq!(emitted(&effects), vec![OutboundEvent::LeaveRoom { room: "rust".to_owned() }]);
    assert!(s.session().active_room.is_none());
    assert!(s.navigate("/settings").is_empty());
}

#[test]
fn disconnect_resets_auth_and_reconnect_rejoins() {
    let mut s = joined();
    s.apply(typing_event("bob", true));

    let effects = s.apply(InboundEvent::Disconnect);
    assert_eq!(
        effects,
        vec![
            Effect::Patch(Patch::Connection(ConnectionState::Disconnected)),
            Effect::Patch(Patch::TypingIndicator(None)),
        ]
    );
    assert!(!s.session().authenticated);
    assert!(s.apply(InboundEvent::Disconnect).is_empty());

    assert_eq!(s.connect().last(), Some(&Effect::Open));
    s.apply(InboundEvent::Connect);
    let effects = s.apply(InboundEvent::Authenticated { username: "ann".to_owned() });
    assert_eq!(emitted(&effects), vec![OutboundEvent::JoinRoom { room: "lobby".to_owned() }]);
}

#[test]
fn server_error_is_logged_without_effects() {
    let mut s = joined();
    assert!(s.apply(InboundEvent::Error { message: "Not authenticated".to_owned() }).is_empty());
    assert!(s.session().is_connected());
}

// =============================================================
// Room events
// =============================================================

#[test]
fn duplicate_user_joined_keeps_membership_size() {
    let mut s = joined();
    let first = s.apply(joined_event("lobby", "bob"));
    assert_eq!(
        first,
        vec![
            Effect::Patch(Patch::AppendNotice("bob has joined the room".to_owned())),
            Effect::Patch(Patch::AddMember { username: "bob".to_owned(), is_self: false }),
        ]
    );

    let second = s.apply(joined_event("lobby", "bob"));
    assert_eq!(second, vec![Effect::Patch(Patch::AppendNotice("bob has joined the room".to_owned()))]);
    assert_eq!(s.members().len(), 1);
}

#[test]
fn own_join_marks_member_as_self() {
    let mut s = joined();
    let effects = s.apply(joined_event("lobby", "ann"));
    assert!(effects.contains(&Effect::Patch(Patch::AddMember { username: "ann".to_owned(), is_self: true })));
}

#[test]
fn user_left_for_absent_user_changes_nothing() {
    let mut s = joined();
    s.apply(joined_event("lobby", "bob"));
    let effects = s.apply(left_event("lobby", "cat"));
    assert_eq!(effects, vec![Effect::Patch(Patch::AppendNotice("cat has left the room".to_owned()))]);
    assert_eq!(s.members().len(), 1);
}

#[test]
fn user_left_removes_member_and_typing_flag() {
    let mut s = joined();
    s.apply(joined_event("lobby", "bob"));
    s.apply(typing_event("bob", true));

    let effects = s.apply(left_event("lobby", "bob"));
    assert!(effects.contains(&Effect::Patch(Patch::RemoveMember { username: "bob".to_owned() })));
    assert!(effects.contains(&Effect::Patch(Patch::TypingIndicator(None))));
    assert!(s.members().is_empty());
}

#[test]
fn events_for_other_rooms_are_ignored() {
    let mut s = joined();
    assert!(s.apply(joined_event("rust", "bob")).is_empty());
    assert!(s.apply(left_event("rust", "bob")).is_empty());
    assert!(s.apply(chat("rust", "bob", None)).is_empty());
    assert!(
        s.apply(InboundEvent::UserTyping { room: "rust".to_owned(), username: "bob".to_owned(), typing: true })
            .is_empty()
    );
    assert!(s.members().is_empty());
}

#[test]
fn chat_message_appends_view_with_ownership() {
    let mut s = joined();
    let effects = s.apply(chat("lobby", "ann", Some(0.5)));
    let [Effect::Patch(Patch::AppendMessage(view))] = effects.as_slice() else {
        panic!("expected one appended message, got {effects:?}");
    };
    assert!(view.is_own);
    assert_eq!(view.text, "hello");
    assert_eq!(view.timestamp.as_deref(), Some("2024-01-01 10:00:00"));
    assert_eq!(view.sentiment_class(), Some(crate::state::chat::SentimentClass::Positive));

    let effects = s.apply(chat("lobby", "bob", None));
    let [Effect::Patch(Patch::AppendMessage(view))] = effects.as_slice() else {
        panic!("expected one appended message, got {effects:?}");
    };
    assert!(!view.is_own);
    assert_eq!(view.sentiment_class(), None);
}

#[test]
fn typing_indicator_tracks_multiple_typists() {
    let mut s = joined();
    let effects = s.apply(typing_event("bob", true));
    assert_eq!(effects, vec![Effect::Patch(Patch::TypingIndicator(Some("bob is typing...".to_owned())))]);

    let effects = s.apply(typing_event("cat", true));
    assert_eq!(
        effects,
        vec![Effect::Patch(Patch::TypingIndicator(Some("bob and 1 other are typing...".to_owned())))]
    );

    assert!(s.apply(typing_event("cat", true)).is_empty());

    s.apply(typing_event("bob", false));
    assert_eq!(s.typing_label().as_deref(), Some("cat is typing..."));
}

#[test]
fn own_typing_echo_is_ignored() {
    let mut s = joined();
    assert!(s.apply(typing_event("ann", true)).is_empty());
    assert_eq!(s.typing_label(), None);
}

#[test]
fn user_status_is_room_agnostic() {
    let mut s = session();
    let effects = s.apply(InboundEvent::UserStatus { username: "bob".to_owned(), status: UserStatus::Online });
    assert_eq!(effects, vec![Effect::Patch(Patch::AddMember { username: "bob".to_owned(), is_self: false })]);
    assert!(
        s.apply(InboundEvent::UserStatus { username: "bob".to_owned(), status: UserStatus::Online }).is_empty()
    );

    let effects = s.apply(InboundEvent::UserStatus { username: "bob".to_owned(), status: UserStatus::Offline });
    assert_eq!(effects, vec![Effect::Patch(Patch::RemoveMember { username: "bob".to_owned() })]);
    assert!(
        s.apply(InboundEvent::UserStatus { username: "bob".to_owned(), status: UserStatus::Offline }).is_empty()
    );
}

#[test]
fn unknown_events_are_ignored() {
    let mut s = joined();
    assert!(s.apply(InboundEvent::Unknown { name: "room_topic".to_owned() }).is_empty());
}

// =============================================================
// Outbound actions
// =============================================================

#[test]
fn send_message_while_disconnected_fails_without_emission() {
    let mut s = session();
    s.join_room("lobby");
    assert_eq!(s.send_message("hi"), Err(SessionError::NotConnected));

    s.connect();
    assert_eq!(s.send_message("hi"), Err(SessionError::NotConnected));
}

#[test]
fn send_message_requires_room_and_text() {
    let mut s = session();
    s.connect();
    s.apply(InboundEvent::Connect);
    assert_eq!(s.send_message("hi"), Err(SessionError::NoActiveRoom));

    s.join_room("lobby");
    assert_eq!(s.send_message("   "), Err(SessionError::EmptyMessage));
}

#[test]
fn send_message_emits_raw_text_without_echo() {
    let mut s = joined();
    let effects = s.send_message(" hi there ").expect("send");
    assert_eq!(
        effects,
        vec![Effect::Emit(OutboundEvent::NewMessage {
            room: "lobby".to_owned(),
            message: " hi there ".to_owned(),
        })]
    );
}

#[test]
fn set_typing_suppressed_without_room_or_connection() {
    let mut s = session();
    let t0 = Instant::now();
    assert!(s.set_typing(true, t0).is_empty());
    s.connect();
    s.apply(InboundEvent::Connect);
    assert!(s.set_typing(true, t0).is_empty());
    s.join_room("lobby");
    assert_eq!(emitted(&s.set_typing(true, t0)), vec![typing("lobby", true)]);
}

// =============================================================
// Local typing debounce
// =============================================================

#[test]
fn keystroke_then_silence_emits_one_stop() {
    let mut s = joined();
    let t0 = Instant::now();
    assert_eq!(emitted(&s.keystroke(t0)), vec![typing("lobby", true)]);
    assert!(s.poll_typing(t0 + Duration::from_millis(1999)).is_empty());
    assert_eq!(emitted(&s.poll_typing(t0 + IDLE)), vec![typing("lobby", false)]);
    assert!(s.poll_typing(t0 + Duration::from_millis(6000)).is_empty());
}

#[test]
fn burst_of_keystrokes_emits_one_start_and_defers_stop() {
    let mut s = joined();
    let t0 = Instant::now();
    let mut starts = 0;
    for offset in [0_u64, 800, 1600, 2400] {
        let effects = s.keystroke(t0 + Duration::from_millis(offset));
        starts += emitted(&effects).iter().filter(|e| **e == typing("lobby", true)).count();
    }
    assert_eq!(starts, 1);

    assert!(s.poll_typing(t0 + Duration::from_millis(4000)).is_empty());
    assert_eq!(s.typing_deadline(), Some(t0 + Duration::from_millis(4400)));
    assert_eq!(emitted(&s.poll_typing(t0 + Duration::from_millis(4400))), vec![typing("lobby", false)]);
}

#[test]
fn keystroke_after_unpolled_expiry_stops_then_restarts() {
    let mut s = joined();
    let t0 = Instant::now();
    s.keystroke(t0);
    let effects = s.keystroke(t0 + Duration::from_millis(5000));
    assert_eq!(emitted(&effects), vec![typing("lobby", false), typing("lobby", true)]);
}

#[test]
fn keystroke_without_room_arms_nothing() {
    let mut s = session();
    s.connect();
    s.apply(InboundEvent::Connect);
    assert!(s.keystroke(Instant::now()).is_empty());
    assert_eq!(s.typing_deadline(), None);
}

#[test]
fn disconnect_cancels_pending_stop() {
    let mut s = joined();
    let t0 = Instant::now();
    s.keystroke(t0);
    s.apply(InboundEvent::Disconnect);
    assert_eq!(s.typing_deadline(), None);
    assert!(s.poll_typing(t0 + IDLE).is_empty());
}

#[test]
fn set_typing_and_keystrokes_share_one_burst() {
    let mut s = joined();
    let t0 = Instant::now();
    let mut sent = Vec::new();
    sent.extend(emitted(&s.set_typing(true, t0)));
    sent.extend(emitted(&s.keystroke(t0 + Duration::from_millis(500))));
    sent.extend(emitted(&s.set_typing(true, t0 + Duration::from_millis(900))));
    sent.extend(emitted(&s.set_typing(false, t0 + Duration::from_millis(1000))));
    sent.extend(emitted(&s.poll_typing(t0 + Duration::from_millis(5000))));
    assert_eq!(sent, vec![typing("lobby", true), typing("lobby", false)]);
    assert_eq!(s.typing_deadline(), None);
}

#[test]
fn set_typing_false_outside_a_burst_emits_nothing() {
    let mut s = joined();
    let t0 = Instant::now();
    assert!(s.set_typing(false, t0).is_empty());

    s.keystroke(t0);
    assert_eq!(emitted(&s.poll_typing(t0 + IDLE)), vec![typing("lobby", false)]);
    assert!(s.set_typing(false, t0 + IDLE).is_empty());
}

#[test]
fn set_typing_true_arms_the_idle_stop() {
    let mut s = joined();
    let t0 = Instant::now();
    s.set_typing(true, t0);
    assert_eq!(s.typing_deadline(), Some(t0 + IDLE));
    assert_eq!(emitted(&s.poll_typing(t0 + IDLE)), vec![typing("lobby", false)]);
}

#[test]
fn send_message_ends_typing_burst_before_message() {
    let mut s = joined();
    let t0 = Instant::now();
    s.keystroke(t0);
    let effects = s.send_message("hello").expect("send");
    assert_eq!(
        emitted(&effects),
        vec![
            typing("lobby", false),
            OutboundEvent::NewMessage { room: "lobby".to_owned(), message: "hello".to_owned() },
        ]
    );
    assert_eq!(s.typing_deadline(), None);
    assert!(s.poll_typing(t0 + IDLE).is_empty());
}
