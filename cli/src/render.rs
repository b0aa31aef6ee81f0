//! Terminal rendering of session patches and parsing of input lines.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use livechat::Patch;
use livechat::state::chat::ChatMessageView;
use livechat::state::session::ConnectionState;
use time::OffsetDateTime;

/// One line typed at the chat prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Message(String),
    Join(String),
    Leave,
    /// Navigate to a path such as `/chat/lobby`.
    Go(String),
    Quit,
    Help,
    Empty,
    Unknown(String),
}

pub const HELP: &str = "commands: /join <room>, /leave, /go <path>, /quit, /help";

#[must_use]
pub fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Input::Message(line.to_owned());
    };

    let (name, arg) = command.split_once(char::is_whitespace).unwrap_or((command, ""));
    let arg = arg.trim();
    match name {
        "join" if !arg.is_empty() => Input::Join(arg.to_owned()),
        "go" if !arg.is_empty() => Input::Go(arg.to_owned()),
        "leave" => Input::Leave,
        "quit" | "exit" => Input::Quit,
        "help" => Input::Help,
        _ => Input::Unknown(line.to_owned()),
    }
}

/// Text for a patch, or `None` when it has no terminal representation.
#[must_use]
pub fn render_patch(patch: &Patch) -> Option<String> {
    match patch {
        Patch::Connection(ConnectionState::Connecting) => Some("* connecting...".to_owned()),
        Patch::Connection(ConnectionState::Connected) => Some("* connected".to_owned()),
        Patch::Connection(ConnectionState::Disconnected) => Some("* disconnected".to_owned()),
        Patch::ClearRoom { room: Some(room) } => Some(format!("== #{room} ==")),
        Patch::ClearRoom { room: None } => Some("== no room ==".to_owned()),
        Patch::AppendMessage(view) => Some(render_message(view, &fallback_timestamp())),
        Patch::AppendNotice(text) => Some(format!("* {text}")),
        Patch::AddMember { username, is_self: true } => Some(format!("+ {username} (you)")),
        Patch::AddMember { username, is_self: false } => Some(format!("+ {username}")),
        Patch::RemoveMember { username } => Some(format!("- {username}")),
        Patch::TypingIndicator(label) => label.as_ref().map(|label| format!("~ {label}")),
    }
}

/// `[10:00] bob :) hey`; the icon is omitted for unscored messages.
#[must_use]
pub fn render_message(view: &ChatMessageView, fallback_timestamp: &str) -> String {
    let timestamp = view.timestamp.as_deref().unwrap_or(fallback_timestamp);
    let who = if view.is_own { format!("{} (you)", view.username) } else { view.username.clone() };
    match view.sentiment_class() {
        Some(class) => format!("[{timestamp}] {who} {} {}", class.icon(), view.text),
        None => format!("[{timestamp}] {who}: {}", view.text),
    }
}

/// Local wall-clock `HH:MM` for messages the server sent without a time.
fn fallback_timestamp() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    format!("{:02}:{:02}", now.hour(), now.minute())
}
