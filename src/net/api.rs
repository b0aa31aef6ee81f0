//! HTTP client for the per-user statistics endpoint.
//!
//! ERROR HANDLING
//! ==============
//! The server answers authorization failures with a non-2xx status and a
//! JSON body carrying an `error` field. The body is parsed before the status
//! is checked so that message reaches the caller as `ApiError::Rejected`;
//! only bodies without one fall back to `ApiError::Status`.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::collections::BTreeMap;

use reqwest::header::{COOKIE, HeaderMap, HeaderValue};
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

use crate::config::ClientConfig;

/// Name of the server's session cookie.
const SESSION_COOKIE_NAME: &str = "session";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned HTTP {0}")]
    Status(u16),
    #[error("{0}")]
    Rejected(String),
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("username `{0}` cannot be used as a path segment")]
    InvalidUsername(String),
}

// =============================================================================
// RESPONSE TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserStats {
    pub username: String,
    #[serde(default)]
    pub messages_sent: u64,
    #[serde(default)]
    pub joined_rooms: Vec<JoinedRoom>,
    /// Count of the user's messages per sentiment label.
    #[serde(default)]
    pub sentiment_stats: BTreeMap<String, u64>,
    /// Detected interests, strongest first.
    #[serde(default)]
    pub interests: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JoinedRoom {
    pub name: String,
    #[serde(default)]
    pub message_count: u64,
    /// Empty descriptions arrive as `""` and are normalized to `None`.
    #[serde(default, deserialize_with = "non_empty")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

// =============================================================================
// CLIENT
// =============================================================================

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client with the configured timeout and session cookie.
    ///
    /// # Errors
    ///
    /// Returns an error if the cookie is not a valid header value or the
    /// HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        if let Some(cookie) = &config.session_cookie {
            headers.insert(COOKIE, HeaderValue::from_str(&format!("{SESSION_COOKIE_NAME}={cookie}"))?);
        }
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .default_headers(headers)
            .build()?;
        Ok(Self { http, base_url: config.base_url.clone() })
    }

    /// Fetch statistics for `username` from `GET /api/user/{username}`.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Rejected`] when the body carries an `error` field
    /// - [`ApiError::Status`] for other non-2xx responses
    /// - [`ApiError::Http`] / [`ApiError::Decode`] for transport or body failures
    /// - [`ApiError::InvalidUsername`] / [`ApiError::InvalidBaseUrl`] before any request
    pub async fn fetch_user_stats(&self, username: &str) -> Result<UserStats, ApiError> {
        let url = user_stats_url(&self.base_url, username)?;
        debug!(%url, "api: fetching user stats");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if let Ok(ErrorBody { error }) = serde_json::from_slice::<ErrorBody>(&body) {
            warn!(%username, status = status.as_u16(), %error, "api: stats request rejected");
            return Err(ApiError::Rejected(error));
        }
        if !status.is_success() {
            warn!(%username, status = status.as_u16(), "api: stats request failed");
            return Err(ApiError::Status(status.as_u16()));
        }

        Ok(serde_json::from_slice(&body)?)
    }
}

/// Statistics URL for `username` under `base_url`.
///
/// The username is appended as a single percent-encoded segment. Empty and
/// dot-segment names are refused since URL normalization would drop them.
///
/// # Errors
///
/// [`ApiError::InvalidUsername`] for `""`, `.` and `..`;
/// [`ApiError::InvalidBaseUrl`] when `base_url` cannot carry a path.
pub fn user_stats_url(base_url: &str, username: &str) -> Result<reqwest::Url, ApiError> {
    if matches!(username, "" | "." | "..") {
        return Err(ApiError::InvalidUsername(username.to_owned()));
    }
    let invalid_base = || ApiError::InvalidBaseUrl(base_url.to_owned());
    let mut url = reqwest::Url::parse(base_url).map_err(|_| invalid_base())?;
    url.path_segments_mut()
        .map_err(|()| invalid_base())?
        .pop_if_empty()
        .extend(["api", "user", username]);
    Ok(url)
}
