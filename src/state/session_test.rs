use super::*;

#[test]
fn new_session_starts_disconnected_without_room() {
    let session = Session::new("ann");
    assert_eq!(session.identity(), "ann");
    assert_eq!(session.connection, ConnectionState::Disconnected);
    assert!(session.active_room.is_none());
    assert!(!session.authenticated);
    assert!(!session.joined);
    assert!(!session.is_connected());
}

#[test]
fn is_active_room_compares_exactly() {
    let mut session = Session::new("ann");
    assert!(!session.is_active_room("lobby"));
    session.active_room = Some("lobby".to_owned());
    assert!(session.is_active_room("lobby"));
    assert!(!session.is_active_room("Lobby"));
}

#[test]
fn room_from_path_reads_chat_room_segment() {
    assert_eq!(room_from_path("/chat_room/lobby"), Some("lobby".to_owned()));
    assert_eq!(room_from_path("/chat_room/lobby/"), Some("lobby".to_owned()));
    assert_eq!(room_from_path("/chat/rustaceans?tab=1#bottom"), Some("rustaceans".to_owned()));
}

#[test]
fn room_from_path_returns_none_without_room() {
    assert_eq!(room_from_path("/"), None);
    assert_eq!(room_from_path("/profile"), None);
    assert_eq!(room_from_path("/chat_room/"), None);
}
