use super::*;

fn view(sentiment: Option<f64>, is_own: bool) -> ChatMessageView {
    ChatMessageView {
        username: "bob".to_owned(),
        text: "hey".to_owned(),
        timestamp: Some("10:00".to_owned()),
        sentiment,
        is_own,
    }
}

#[test]
fn plain_lines_are_messages() {
    assert_eq!(parse_input("  hello there "), Input::Message("hello there".to_owned()));
    assert_eq!(parse_input("   "), Input::Empty);
}

#[test]
fn slash_commands_parse_arguments() {
    assert_eq!(parse_input("/join lobby"), Input::Join("lobby".to_owned()));
    assert_eq!(parse_input("/go /chat/rust"), Input::Go("/chat/rust".to_owned()));
    assert_eq!(parse_input("/leave"), Input::Leave);
    assert_eq!(parse_input("/quit"), Input::Quit);
    assert_eq!(parse_input("/help"), Input::Help);
}

#[test]
fn commands_missing_arguments_are_unknown() {
    assert_eq!(parse_input("/join"), Input::Unknown("/join".to_owned()));
    assert_eq!(parse_input("/dance"), Input::Unknown("/dance".to_owned()));
}

#[test]
fn scored_message_shows_icon() {
    assert_eq!(render_message(&view(Some(0.8), false), "00:00"), "[10:00] bob :) hey");
    assert_eq!(render_message(&view(Some(-0.8), false), "00:00"), "[10:00] bob :( hey");
}

#[test]
fn unscored_message_has_no_icon() {
    assert_eq!(render_message(&view(None, false), "00:00"), "[10:00] bob: hey");
}

#[test]
fn own_message_is_marked_and_missing_time_uses_fallback() {
    let mut own = view(Some(0.0), true);
    own.timestamp = None;
    assert_eq!(render_message(&own, "09:30"), "[09:30] bob (you) :| hey");
}

#[test]
fn patches_render_as_status_lines() {
    assert_eq!(render_patch(&Patch::Connection(ConnectionState::Connected)).as_deref(), Some("* connected"));
    assert_eq!(
        render_patch(&Patch::AddMember { username: "ann".to_owned(), is_self: true }).as_deref(),
        Some("+ ann (you)")
    );
    assert_eq!(
        render_patch(&Patch::TypingIndicator(Some("bob is typing...".to_owned()))).as_deref(),
        Some("~ bob is typing...")
    );
    assert_eq!(render_patch(&Patch::TypingIndicator(None)), None);
}
