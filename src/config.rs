//! Client configuration parsed from environment variables.

use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_TYPING_IDLE_MS: u64 = 2000;
pub const DEFAULT_RECONNECT_INITIAL_MS: u64 = 1000;
pub const DEFAULT_RECONNECT_MAX_MS: u64 = 10_000;
/// Floor for the first reconnect delay.
pub const MIN_RECONNECT_MS: u64 = 100;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Engine.IO v4 websocket endpoint, relative to the base URL.
pub const SOCKET_IO_PATH: &str = "/socket.io/?EIO=4&transport=websocket";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing username; pass --username or set LIVECHAT_USERNAME")]
    MissingUsername,
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

/// Capped exponential backoff between reconnect attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub initial_ms: u64,
    pub max_ms: u64,
}

impl ReconnectPolicy {
    /// Policy with `initial_ms` raised to [`MIN_RECONNECT_MS`] and `max_ms`
    /// raised to at least `initial_ms`.
    #[must_use]
    pub fn new(initial_ms: u64, max_ms: u64) -> Self {
        let initial_ms = initial_ms.max(MIN_RECONNECT_MS);
        Self { initial_ms, max_ms: max_ms.max(initial_ms) }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { initial_ms: DEFAULT_RECONNECT_INITIAL_MS, max_ms: DEFAULT_RECONNECT_MAX_MS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// HTTP base URL of the chat server, without trailing slash.
    pub base_url: String,
    /// Identity sent with `authenticate`. Fixed for the session's lifetime.
    pub username: String,
    /// Room to join once authenticated.
    pub room: Option<String>,
    /// Value of the server's `session` cookie, for the stats endpoint.
    pub session_cookie: Option<String>,
    /// Local inactivity window before a `typing=false` is sent.
    pub typing_idle: Duration,
    pub reconnect: ReconnectPolicy,
    pub http_timeout: Duration,
}

impl ClientConfig {
    /// Config with defaults for everything except the server and identity.
    #[must_use]
    pub fn new(base_url: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            username: username.into(),
            room: None,
            session_cookie: None,
            typing_idle: Duration::from_millis(DEFAULT_TYPING_IDLE_MS),
            reconnect: ReconnectPolicy::default(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }

    #[must_use]
    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }

    /// Build typed config from environment variables.
    ///
    /// Required:
    /// - `LIVECHAT_USERNAME`
    ///
    /// Optional:
    /// - `LIVECHAT_BASE_URL`: default `http://127.0.0.1:5000`
    /// - `LIVECHAT_ROOM`: room joined after authentication
    /// - `LIVECHAT_SESSION_COOKIE`: session cookie for the stats endpoint
    /// - `LIVECHAT_TYPING_IDLE_MS`: default 2000
    /// - `LIVECHAT_RECONNECT_INITIAL_MS`: default 1000
    /// - `LIVECHAT_RECONNECT_MAX_MS`: default 10000
    /// - `LIVECHAT_HTTP_TIMEOUT_SECS`: default 10
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`], reading values through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let username = non_empty("LIVECHAT_USERNAME").ok_or(ConfigError::MissingUsername)?;
        let base_url = non_empty("LIVECHAT_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());

        let mut config = Self::new(base_url, username);
        config.room = non_empty("LIVECHAT_ROOM");
        config.session_cookie = non_empty("LIVECHAT_SESSION_COOKIE");
        config.typing_idle =
            Duration::from_millis(parse_or(&lookup, "LIVECHAT_TYPING_IDLE_MS", DEFAULT_TYPING_IDLE_MS));
        config.reconnect = ReconnectPolicy::new(
            parse_or(&lookup, "LIVECHAT_RECONNECT_INITIAL_MS", DEFAULT_RECONNECT_INITIAL_MS),
            parse_or(&lookup, "LIVECHAT_RECONNECT_MAX_MS", DEFAULT_RECONNECT_MAX_MS),
        );
        config.http_timeout =
            Duration::from_secs(parse_or(&lookup, "LIVECHAT_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS));
        Ok(config)
    }

    /// Websocket URL for the Socket.IO endpoint.
    pub fn ws_url(&self) -> Result<String, ConfigError> {
        if let Some(rest) = self.base_url.strip_prefix("http://") {
            return Ok(format!("ws://{rest}{SOCKET_IO_PATH}"));
        }
        if let Some(rest) = self.base_url.strip_prefix("https://") {
            return Ok(format!("wss://{rest}{SOCKET_IO_PATH}"));
        }

        Err(ConfigError::InvalidBaseUrl(self.base_url.clone()))
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    lookup(key).and_then(|v| v.trim().parse::<T>().ok()).unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
