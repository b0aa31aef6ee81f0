//! Shared event model and Socket.IO text codec for the realtime chat transport.
//!
//! This crate owns the wire representation used by the session client and the
//! CLI. Packets follow Engine.IO v4 framing with Socket.IO v5 packets for the
//! default namespace carried inside `message` packets. Payloads stay flexible
//! (`serde_json::Value`) at the packet layer and are narrowed into typed
//! [`InboundEvent`] / [`OutboundEvent`] values at the event layer.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// =============================================================================
// ERRORS
// =============================================================================

/// Error returned by [`decode_packet`] and [`InboundEvent::from_event`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The websocket text frame was empty.
    #[error("empty packet")]
    Empty,
    /// The leading Engine.IO type digit is not a known packet type.
    #[error("unknown engine.io packet type: {0:?}")]
    UnknownEnginePacket(char),
    /// The Socket.IO type digit inside a message packet is unknown or unsupported.
    #[error("unknown socket.io packet type: {0:?}")]
    UnknownSocketPacket(char),
    /// The packet addressed a namespace other than `/`.
    #[error("unsupported namespace: {0}")]
    UnsupportedNamespace(String),
    /// An event packet did not carry a `["name", payload]` array.
    #[error("malformed event packet: {0}")]
    MalformedEvent(&'static str),
    /// A JSON body could not be parsed or did not match the event schema.
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// PACKETS
// =============================================================================

/// Engine.IO open handshake sent by the server right after the upgrade.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    /// Engine.IO session identifier.
    pub sid: String,
    /// Transports the server is willing to upgrade to.
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Server ping cadence in milliseconds.
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong before closing.
    pub ping_timeout: u64,
    /// Largest payload the server accepts, if advertised.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
}

/// Engine.IO transport packet. One packet per websocket text frame.
#[derive(Clone, Debug, PartialEq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping,
    Pong,
    Message(SocketPacket),
    Noop,
}

/// Socket.IO packet for the default namespace.
#[derive(Clone, Debug, PartialEq)]
pub enum SocketPacket {
    /// Namespace connect. Clients send it bare; servers answer with `{sid}`.
    Connect(Option<Value>),
    Disconnect,
    /// Named event with a single JSON payload.
    Event { name: String, payload: Value },
    /// Namespace connection refused by the server.
    ConnectError(Value),
}

impl EnginePacket {
    /// Wrap a named event into a message packet.
    #[must_use]
    pub fn event(name: impl Into<String>, payload: Value) -> Self {
        Self::Message(SocketPacket::Event { name: name.into(), payload })
    }
}

/// Encode a packet into the text representation sent over the websocket.
#[must_use]
pub fn encode_packet(packet: &EnginePacket) -> String {
    match packet {
        EnginePacket::Open(handshake) => {
            // Serializing a plain struct of strings and integers cannot fail.
            let body = serde_json::to_string(handshake).unwrap_or_default();
            format!("0{body}")
        }
        EnginePacket::Close => "1".to_owned(),
        EnginePacket::Ping => "2".to_owned(),
        EnginePacket::Pong => "3".to_owned(),
        EnginePacket::Message(socket) => format!("4{}", encode_socket_packet(socket)),
        EnginePacket::Noop => "6".to_owned(),
    }
}

fn encode_socket_packet(packet: &SocketPacket) -> String {
    match packet {
        SocketPacket::Connect(None) => "0".to_owned(),
        SocketPacket::Connect(Some(auth)) => format!("0{auth}"),
        SocketPacket::Disconnect => "1".to_owned(),
        SocketPacket::Event { name, payload } => {
            let body = Value::Array(vec![Value::String(name.clone()), payload.clone()]);
            format!("2{body}")
        }
        SocketPacket::ConnectError(data) => format!("4{data}"),
    }
}

/// Decode one websocket text frame into a packet.
///
/// # Errors
///
/// Returns [`CodecError`] for empty input, unknown type digits, non-default
/// namespaces, and malformed JSON bodies.
pub fn decode_packet(text: &str) -> Result<EnginePacket, CodecError> {
    let mut chars = text.chars();
    let kind = chars.next().ok_or(CodecError::Empty)?;
    let rest = chars.as_str();

    match kind {
        '0' => Ok(EnginePacket::Open(serde_json::from_str(rest)?)),
        '1' => Ok(EnginePacket::Close),
        // Probe payloads only appear during transport upgrades; ignore them.
        '2' => Ok(EnginePacket::Ping),
        '3' => Ok(EnginePacket::Pong),
        '4' => Ok(EnginePacket::Message(decode_socket_packet(rest)?)),
        '6' => Ok(EnginePacket::Noop),
        other => Err(CodecError::UnknownEnginePacket(other)),
    }
}

fn decode_socket_packet(text: &str) -> Result<SocketPacket, CodecError> {
    let mut chars = text.chars();
    let kind = chars.next().ok_or(CodecError::Empty)?;
    let body = strip_namespace(chars.as_str())?;

    match kind {
        '0' => {
            if body.trim().is_empty() {
                Ok(SocketPacket::Connect(None))
            } else {
                Ok(SocketPacket::Connect(Some(serde_json::from_str(body)?)))
            }
        }
        '1' => Ok(SocketPacket::Disconnect),
        '2' => decode_event(body),
        '4' => Ok(SocketPacket::ConnectError(serde_json::from_str(body)?)),
        other => Err(CodecError::UnknownSocketPacket(other)),
    }
}

/// Strip a `/,` default-namespace prefix; reject any other namespace.
fn strip_namespace(body: &str) -> Result<&str, CodecError> {
    if !body.starts_with('/') {
        return Ok(body);
    }
    let (namespace, rest) = body.split_once(',').unwrap_or((body, ""));
    if namespace == "/" {
        Ok(rest)
    } else {
        Err(CodecError::UnsupportedNamespace(namespace.to_owned()))
    }
}

fn decode_event(body: &str) -> Result<SocketPacket, CodecError> {
    // Skip the optional acknowledgement id.
    let body = body.trim_start_matches(|c: char| c.is_ascii_digit());
    let value: Value = serde_json::from_str(body)?;
    let Value::Array(mut items) = value else {
        return Err(CodecError::MalformedEvent("expected array"));
    };
    if items.is_empty() {
        return Err(CodecError::MalformedEvent("missing event name"));
    }
    let Value::String(name) = items.remove(0) else {
        return Err(CodecError::MalformedEvent("event name must be a string"));
    };
    let payload = if items.is_empty() { Value::Null } else { items.remove(0) };
    Ok(SocketPacket::Event { name, payload })
}

// =============================================================================
// OUTBOUND EVENTS
// =============================================================================

/// Actions sent from the client to the chat server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutboundEvent {
    Authenticate { username: String },
    JoinRoom { room: String },
    LeaveRoom { room: String },
    NewMessage { room: String, message: String },
    Typing { room: String, typing: bool },
}

impl OutboundEvent {
    /// Socket.IO event name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Authenticate { .. } => "authenticate",
            Self::JoinRoom { .. } => "join_room",
            Self::LeaveRoom { .. } => "leave_room",
            Self::NewMessage { .. } => "new_message",
            Self::Typing { .. } => "typing",
        }
    }

    /// JSON payload carried alongside the event name.
    #[must_use]
    pub fn payload(&self) -> Value {
        match self {
            Self::Authenticate { username } => serde_json::json!({ "username": username }),
            Self::JoinRoom { room } | Self::LeaveRoom { room } => serde_json::json!({ "room": room }),
            Self::NewMessage { room, message } => {
                serde_json::json!({ "room": room, "message": message })
            }
            Self::Typing { room, typing } => serde_json::json!({ "room": room, "typing": typing }),
        }
    }

    /// Wrap the event into a transport packet.
    #[must_use]
    pub fn to_packet(&self) -> EnginePacket {
        EnginePacket::event(self.name(), self.payload())
    }
}

// =============================================================================
// INBOUND EVENTS
// =============================================================================

/// Broadcast chat message as delivered by the server.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ChatMessage {
    pub room: String,
    pub username: String,
    pub message: String,
    /// Server-formatted send time. Older servers send epoch numbers.
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub timestamp: Option<String>,
    /// Compound sentiment score in roughly `[-1, 1]`, when the server scored it.
    #[serde(default)]
    pub sentiment: Option<f64>,
}

/// Global presence signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Online,
    Offline,
}

/// Events delivered to the session client.
///
/// `Connect` and `Disconnect` are produced by the transport itself; every
/// other variant maps to a named server event.
#[derive(Clone, Debug, PartialEq)]
pub enum InboundEvent {
    Connect,
    Disconnect,
    Error { message: String },
    Authenticated { username: String },
    ChatMessage(ChatMessage),
    UserJoined { room: String, username: String },
    UserLeft { room: String, username: String },
    UserTyping { room: String, username: String, typing: bool },
    UserStatus { username: String, status: UserStatus },
    /// An event name this client does not handle.
    Unknown { name: String },
}

#[derive(Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct UsernamePayload {
    username: String,
}

#[derive(Deserialize)]
struct RoomUserPayload {
    room: String,
    username: String,
}

#[derive(Deserialize)]
struct TypingPayload {
    room: String,
    username: String,
    #[serde(default)]
    typing: bool,
}

#[derive(Deserialize)]
struct StatusPayload {
    username: String,
    status: UserStatus,
}

impl InboundEvent {
    /// Narrow a named Socket.IO event into a typed inbound event.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Json`] when a known event's payload does not
    /// match its schema.
    pub fn from_event(name: &str, payload: Value) -> Result<Self, CodecError> {
        let event = match name {
            "connect" => Self::Connect,
            "disconnect" => Self::Disconnect,
            "error" => {
                let p: ErrorPayload = serde_json::from_value(payload)?;
                Self::Error { message: p.message }
            }
            "authenticated" => {
                let p: UsernamePayload = serde_json::from_value(payload)?;
                Self::Authenticated { username: p.username }
            }
            "chat_message" => Self::ChatMessage(serde_json::from_value(payload)?),
            "user_joined" => {
                let p: RoomUserPayload = serde_json::from_value(payload)?;
                Self::UserJoined { room: p.room, username: p.username }
            }
            "user_left" => {
                let p: RoomUserPayload = serde_json::from_value(payload)?;
                Self::UserLeft { room: p.room, username: p.username }
            }
            "user_typing" => {
                let p: TypingPayload = serde_json::from_value(payload)?;
                Self::UserTyping { room: p.room, username: p.username, typing: p.typing }
            }
            "user_status" => {
                let p: StatusPayload = serde_json::from_value(payload)?;
                Self::UserStatus { username: p.username, status: p.status }
            }
            other => Self::Unknown { name: other.to_owned() },
        };
        Ok(event)
    }
}

fn deserialize_optional_timestamp<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(D::Error::custom("timestamp must be a string or number")),
    }
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
