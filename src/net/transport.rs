//! Websocket transport that drives a `LiveSession`.
//!
//! The driver task owns the socket and the reducer. It connects, performs
//! the Engine.IO / Socket.IO handshake, feeds inbound events to the reducer
//! one at a time, applies the resulting effects, and reconnects with capped
//! exponential backoff when the connection drops.
//!
//! DESIGN
//! ======
//! One `select!` loop per connection:
//! - inbound websocket frames → decode → `LiveSession::apply` → effects
//! - commands from `SessionHandle` → reducer operation → effects
//! - local typing deadline → `LiveSession::poll_typing`
//! - heartbeat deadline → treat the connection as dead
//!
//! Effects split two ways: `Emit` goes out on the socket, `Patch` goes to
//! the renderer channel. While offline, commands still reach the reducer so
//! callers get an immediate `NotConnected` instead of blocking.

#[cfg(test)]
#[path = "transport_test.rs"]
mod transport_test;

use std::time::Duration;

use events::{EnginePacket, InboundEvent, SocketPacket, decode_packet, encode_packet};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use crate::client::{Effect, LiveSession, Patch, SessionError};
use crate::config::{ClientConfig, ConfigError, ReconnectPolicy};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Buffered view patches before the driver waits on the renderer.
const PATCH_CHANNEL_CAPACITY: usize = 256;

/// Upper bound on the websocket upgrade.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("websocket failed: {0}")]
    Ws(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("timed out opening websocket")]
    ConnectTimeout,
    #[error("server refused namespace connect: {0}")]
    Refused(String),
    #[error("no traffic from server within heartbeat window")]
    HeartbeatTimeout,
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Ws(Box::new(error))
    }
}

// =============================================================================
// HANDLE
// =============================================================================

#[derive(Debug)]
enum Command {
    SendMessage { text: String, reply: oneshot::Sender<Result<(), SessionError>> },
    Keystroke,
    SetTyping(bool),
    JoinRoom(String),
    LeaveRoom,
    Navigate(String),
    Shutdown,
}

/// Cheap, cloneable handle for issuing operations to a running session.
///
/// Methods other than `send_message` are fire-and-forget and return `false`
/// only when the driver task has exited.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl SessionHandle {
    /// Send a chat message to the active room.
    ///
    /// # Errors
    ///
    /// Returns the reducer's [`SessionError`]; a stopped driver reports
    /// [`SessionError::NotConnected`].
    pub async fn send_message(&self, text: impl Into<String>) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::SendMessage { text: text.into(), reply }).is_err() {
            return Err(SessionError::NotConnected);
        }
        rx.await.unwrap_or(Err(SessionError::NotConnected))
    }

    /// Register a local keystroke in the message input.
    pub fn keystroke(&self) -> bool {
        self.tx.send(Command::Keystroke).is_ok()
    }

    /// Start or extend (`true`) or end (`false`) the local typing burst.
    pub fn set_typing(&self, typing: bool) -> bool {
        self.tx.send(Command::SetTyping(typing)).is_ok()
    }

    pub fn join_room(&self, room: impl Into<String>) -> bool {
        self.tx.send(Command::JoinRoom(room.into())).is_ok()
    }

    pub fn leave_room(&self) -> bool {
        self.tx.send(Command::LeaveRoom).is_ok()
    }

    /// Re-derive the active room from a navigation path.
    pub fn navigate(&self, path: impl Into<String>) -> bool {
        self.tx.send(Command::Navigate(path.into())).is_ok()
    }

    /// Close the connection and stop reconnecting.
    pub fn shutdown(&self) -> bool {
        self.tx.send(Command::Shutdown).is_ok()
    }
}

/// A spawned session: the command handle, the patch stream, and the task.
#[derive(Debug)]
pub struct RunningSession {
    pub handle: SessionHandle,
    pub patches: mpsc::Receiver<Patch>,
    pub task: JoinHandle<()>,
}

/// Spawn the session driver for `config` on the current tokio runtime.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidBaseUrl`] when the base URL has no
/// websocket equivalent.
pub fn spawn_session(config: ClientConfig) -> Result<RunningSession, ConfigError> {
    let url = config.ws_url()?;
    let (tx, commands) = mpsc::unbounded_channel();
    let (patch_tx, patches) = mpsc::channel(PATCH_CHANNEL_CAPACITY);

    let driver = Driver {
        session: LiveSession::new(config.username.clone(), config.typing_idle),
        commands,
        patches: patch_tx,
    };
    let task = tokio::spawn(session_loop(driver, url, config));

    Ok(RunningSession { handle: SessionHandle { tx }, patches, task })
}

// =============================================================================
// DRIVER
// =============================================================================

struct Driver {
    session: LiveSession,
    commands: mpsc::UnboundedReceiver<Command>,
    patches: mpsc::Sender<Patch>,
}

#[derive(Debug, PartialEq, Eq)]
enum Exit {
    Closed,
    Shutdown,
}

async fn session_loop(mut driver: Driver, url: String, config: ClientConfig) {
    let mut backoff = Backoff::new(config.reconnect);

    if let Some(room) = &config.room {
        let effects = driver.session.join_room(room);
        let _ = dispatch(effects, &driver.patches, None).await;
    }

    loop {
        let effects = driver.session.connect();
        let _ = dispatch(effects, &driver.patches, None).await;

        let result = run_connection(&mut driver, &url).await;

        let was_connected = driver.session.session().is_connected();
        let effects = driver.session.apply(InboundEvent::Disconnect);
        let _ = dispatch(effects, &driver.patches, None).await;

        match result {
            Ok(Exit::Shutdown) => {
                info!("transport: shut down");
                return;
            }
            Ok(Exit::Closed) => info!("transport: connection closed"),
            Err(e) => warn!(error = %e, "transport: connection failed"),
        }

        if was_connected {
            backoff.reset();
        }
        let delay = backoff.next_delay();
        debug!(delay_ms = delay.as_millis(), "transport: reconnecting after backoff");
        if wait_offline(&mut driver, delay).await == Exit::Shutdown {
            info!("transport: shut down while offline");
            return;
        }
    }
}

/// Run one websocket connection until it closes, fails, or is shut down.
async fn run_connection(driver: &mut Driver, url: &str) -> Result<Exit, TransportError> {
    let Driver { session, commands, patches } = driver;

    let connect = connect_async(url);
    tokio::pin!(connect);
    let timeout = tokio::time::sleep(CONNECT_TIMEOUT);
    tokio::pin!(timeout);
    let stream = loop {
        tokio::select! {
            result = &mut connect => break result?.0,
            () = &mut timeout => return Err(TransportError::ConnectTimeout),
            cmd = commands.recv() => {
                let Some(cmd) = cmd else { return Ok(Exit::Shutdown) };
                if handle_command(session, patches, None, cmd).await? == Some(Exit::Shutdown) {
                    return Ok(Exit::Shutdown);
                }
            }
        }
    };
    debug!(%url, "transport: websocket open");

    let (mut sink, mut stream) = stream.split();
    let mut heartbeat: Option<Duration> = None;
    let mut heartbeat_deadline: Option<Instant> = None;

    loop {
        let typing_deadline = session.typing_deadline().map(Instant::from_std);

        tokio::select! {
            msg = stream.next() => {
                let Some(msg) = msg else { return Ok(Exit::Closed) };
                match msg? {
                    Message::Text(text) => {
                        match decode_packet(text.as_str()) {
                            Ok(packet) => {
                                if let Some(exit) = handle_packet(session, patches, &mut sink, &mut heartbeat, packet).await? {
                                    return Ok(exit);
                                }
                            }
                            Err(e) => warn!(error = %e, "transport: dropping undecodable packet"),
                        }
                        if let Some(window) = heartbeat {
                            heartbeat_deadline = Some(Instant::now() + window);
                        }
                    }
                    Message::Close(_) => return Ok(Exit::Closed),
                    _ => {}
                }
            }
            cmd = commands.recv() => {
                let exit = match cmd {
                    Some(cmd) => handle_command(session, patches, Some(&mut sink), cmd).await?,
                    None => Some(Exit::Shutdown),
                };
                if exit == Some(Exit::Shutdown) {
                    let _ = send_packet(&mut sink, &EnginePacket::Message(SocketPacket::Disconnect)).await;
                    let _ = sink.close().await;
                    return Ok(Exit::Shutdown);
                }
            }
            () = sleep_until_opt(typing_deadline) => {
                let effects = session.poll_typing(std::time::Instant::now());
                dispatch(effects, patches, Some(&mut sink)).await?;
            }
            () = sleep_until_opt(heartbeat_deadline) => {
                return Err(TransportError::HeartbeatTimeout);
            }
        }
    }
}

async fn handle_packet(
    session: &mut LiveSession,
    patches: &mpsc::Sender<Patch>,
    sink: &mut WsSink,
    heartbeat: &mut Option<Duration>,
    packet: EnginePacket,
) -> Result<Option<Exit>, TransportError> {
    match packet {
        EnginePacket::Open(handshake) => {
            debug!(sid = %handshake.sid, "transport: engine.io open");
            *heartbeat = Some(Duration::from_millis(handshake.ping_interval + handshake.ping_timeout));
            send_packet(sink, &EnginePacket::Message(SocketPacket::Connect(None))).await?;
        }
        EnginePacket::Ping => send_packet(sink, &EnginePacket::Pong).await?,
        EnginePacket::Pong | EnginePacket::Noop => {}
        EnginePacket::Close | EnginePacket::Message(SocketPacket::Disconnect) => {
            return Ok(Some(Exit::Closed));
        }
        EnginePacket::Message(SocketPacket::ConnectError(data)) => {
            return Err(TransportError::Refused(data.to_string()));
        }
        EnginePacket::Message(SocketPacket::Connect(_)) => {
            let effects = session.apply(InboundEvent::Connect);
            dispatch(effects, patches, Some(sink)).await?;
        }
        EnginePacket::Message(SocketPacket::Event { name, payload }) => {
            match InboundEvent::from_event(&name, payload) {
                Ok(event) => {
                    let effects = session.apply(event);
                    dispatch(effects, patches, Some(sink)).await?;
                }
                Err(e) => warn!(%name, error = %e, "transport: dropping malformed event"),
            }
        }
    }
    Ok(None)
}

async fn handle_command(
    session: &mut LiveSession,
    patches: &mpsc::Sender<Patch>,
    sink: Option<&mut WsSink>,
    cmd: Command,
) -> Result<Option<Exit>, TransportError> {
    let effects = match cmd {
        Command::SendMessage { text, reply } => match session.send_message(&text) {
            Ok(effects) => {
                let _ = reply.send(Ok(()));
                effects
            }
            Err(e) => {
                let _ = reply.send(Err(e));
                Vec::new()
            }
        },
        Command::Keystroke => session.keystroke(std::time::Instant::now()),
        Command::SetTyping(typing) => session.set_typing(typing, std::time::Instant::now()),
        Command::JoinRoom(room) => session.join_room(&room),
        Command::LeaveRoom => session.leave_room(),
        Command::Navigate(path) => session.navigate(&path),
        Command::Shutdown => return Ok(Some(Exit::Shutdown)),
    };
    dispatch(effects, patches, sink).await?;
    Ok(None)
}

/// Service commands while waiting out the reconnect delay.
async fn wait_offline(driver: &mut Driver, delay: Duration) -> Exit {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            () = &mut sleep => return Exit::Closed,
            cmd = driver.commands.recv() => {
                let Some(cmd) = cmd else { return Exit::Shutdown };
                match handle_command(&mut driver.session, &driver.patches, None, cmd).await {
                    Ok(Some(Exit::Shutdown)) => return Exit::Shutdown,
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "transport: offline command failed"),
                }
            }
        }
    }
}

/// Apply reducer effects: emits go to the socket, patches to the renderer.
async fn dispatch(
    effects: Vec<Effect>,
    patches: &mpsc::Sender<Patch>,
    mut sink: Option<&mut WsSink>,
) -> Result<(), TransportError> {
    for effect in effects {
        match effect {
            // The session loop opens the socket right after `connect()`.
            Effect::Open => debug!("transport: open requested"),
            Effect::Emit(event) => match sink.as_deref_mut() {
                Some(sink) => {
                    debug!(event = event.name(), "transport: emit");
                    send_packet(sink, &event.to_packet()).await?;
                }
                None => debug!(event = event.name(), "transport: dropping emit while offline"),
            },
            Effect::Patch(patch) => {
                if patches.send(patch).await.is_err() {
                    debug!("transport: patch receiver dropped");
                }
            }
        }
    }
    Ok(())
}

async fn send_packet(sink: &mut WsSink, packet: &EnginePacket) -> Result<(), TransportError> {
    sink.send(Message::text(encode_packet(packet))).await?;
    Ok(())
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

// =============================================================================
// BACKOFF
// =============================================================================

#[derive(Debug, Clone)]
struct Backoff {
    policy: ReconnectPolicy,
    current_ms: u64,
}

impl Backoff {
    fn new(policy: ReconnectPolicy) -> Self {
        let policy = ReconnectPolicy::new(policy.initial_ms, policy.max_ms);
        Self { policy, current_ms: policy.initial_ms }
    }

    fn reset(&mut self) {
        self.current_ms = self.policy.initial_ms;
    }

    /// Un-jittered delay for the next attempt; doubles up to the cap.
    fn next_base(&mut self) -> Duration {
        let base = self.current_ms.min(self.policy.max_ms);
        self.current_ms = self.current_ms.saturating_mul(2).min(self.policy.max_ms);
        Duration::from_millis(base)
    }

    /// Base delay plus up to 25% random jitter.
    fn next_delay(&mut self) -> Duration {
        let base = self.next_base();
        let spread = u64::try_from(base.as_millis() / 4).unwrap_or(0);
        if spread == 0 {
            return base;
        }
        base + Duration::from_millis(rand::rng().random_range(0..=spread))
    }
}
