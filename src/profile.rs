//! Display models for the user statistics and interests panels.
//!
//! Both panels are built from the same `fetch_user_stats` result. A failed
//! fetch never propagates: it turns into an alert panel carrying either the
//! server's own message or a generic retry hint.

#[cfg(test)]
#[path = "profile_test.rs"]
mod profile_test;

use std::fmt;

use crate::net::api::{ApiError, UserStats};

pub const STATS_FAILED: &str = "Failed to load user statistics. Please try again.";
pub const INTERESTS_FAILED: &str = "Failed to load user interests. Please try again.";
pub const NO_ROOMS: &str = "You haven't joined any rooms yet.";
pub const NO_INTERESTS: &str = "No interests detected yet. Chat more to build your interest profile!";

/// Interests shown in the strength chart; badges show all of them.
pub const INTEREST_CHART_LIMIT: usize = 10;

/// Sentiment labels that lead the distribution, in this order.
const SENTIMENT_ORDER: [&str; 3] = ["positive", "neutral", "negative"];

// =============================================================================
// STATISTICS
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoomLine {
    pub name: String,
    pub message_count: u64,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentimentSlice {
    /// Capitalized label, e.g. `Positive`.
    pub label: String,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatsView {
    pub username: String,
    pub messages_sent: u64,
    pub rooms_joined: usize,
    pub rooms: Vec<RoomLine>,
    /// Empty when the server reported no sentiment data.
    pub sentiment: Vec<SentimentSlice>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatsPanel {
    Loaded(StatsView),
    Alert(String),
}

impl StatsPanel {
    #[must_use]
    pub fn from_result(result: Result<UserStats, ApiError>) -> Self {
        match result {
            Ok(stats) => Self::Loaded(StatsView::from(stats)),
            Err(e) => Self::Alert(alert_text(&e, STATS_FAILED)),
        }
    }
}

impl From<UserStats> for StatsView {
    fn from(stats: UserStats) -> Self {
        let rooms: Vec<RoomLine> = stats
            .joined_rooms
            .into_iter()
            .map(|room| RoomLine {
                name: room.name,
                message_count: room.message_count,
                description: room.description,
            })
            .collect();

        let mut sentiment = Vec::with_capacity(stats.sentiment_stats.len());
        for key in SENTIMENT_ORDER {
            if let Some(count) = stats.sentiment_stats.get(key) {
                sentiment.push(SentimentSlice { label: capitalize(key), count: *count });
            }
        }
        for (key, count) in &stats.sentiment_stats {
            if !SENTIMENT_ORDER.contains(&key.as_str()) {
                sentiment.push(SentimentSlice { label: capitalize(key), count: *count });
            }
        }

        Self {
            username: stats.username,
            messages_sent: stats.messages_sent,
            rooms_joined: rooms.len(),
            rooms,
            sentiment,
        }
    }
}

impl fmt::Display for StatsPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let view = match self {
            Self::Alert(message) => return writeln!(f, "! {message}"),
            Self::Loaded(view) => view,
        };

        writeln!(f, "Username:      {}", view.username)?;
        writeln!(f, "Messages sent: {}", view.messages_sent)?;
        writeln!(f, "Rooms joined:  {}", view.rooms_joined)?;

        if !view.sentiment.is_empty() {
            writeln!(f)?;
            writeln!(f, "Message sentiment:")?;
            let width = view.sentiment.iter().map(|s| s.label.len()).max().unwrap_or(0);
            for slice in &view.sentiment {
                writeln!(f, "  {:<width$}  {}", slice.label, slice.count)?;
            }
        }

        writeln!(f)?;
        writeln!(f, "Joined rooms:")?;
        if view.rooms.is_empty() {
            return writeln!(f, "  {NO_ROOMS}");
        }
        for room in &view.rooms {
            writeln!(f, "  {} ({} messages)", room.name, room.message_count)?;
            if let Some(description) = &room.description {
                writeln!(f, "    {description}")?;
            }
        }
        Ok(())
    }
}

// =============================================================================
// INTERESTS
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterestBar {
    pub label: String,
    /// Rank-derived strength: 10 for the first interest, 9 for the second...
    pub strength: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InterestsPanel {
    Empty,
    Loaded { badges: Vec<String>, chart: Vec<InterestBar> },
    Alert(String),
}

impl InterestsPanel {
    #[must_use]
    pub fn from_result(result: Result<UserStats, ApiError>) -> Self {
        match result {
            Ok(stats) => Self::from_interests(stats.interests),
            Err(e) => Self::Alert(alert_text(&e, INTERESTS_FAILED)),
        }
    }

    #[must_use]
    pub fn from_interests(interests: Vec<String>) -> Self {
        if interests.is_empty() {
            return Self::Empty;
        }
        let chart = interests
            .iter()
            .take(INTEREST_CHART_LIMIT)
            .zip((1..=10u32).rev())
            .map(|(label, strength)| InterestBar { label: label.clone(), strength })
            .collect();
        Self::Loaded { badges: interests, chart }
    }
}

impl fmt::Display for InterestsPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alert(message) => writeln!(f, "! {message}"),
            Self::Empty => writeln!(f, "{NO_INTERESTS}"),
            Self::Loaded { badges, chart } => {
                writeln!(f, "Top interests:")?;
                let width = chart.iter().map(|bar| bar.label.len()).max().unwrap_or(0);
                for bar in chart {
                    let blocks = "#".repeat(bar.strength as usize);
                    writeln!(f, "  {:<width$}  {blocks}", bar.label)?;
                }
                writeln!(f)?;
                writeln!(f, "Your interests: {}", badges.join(", "))?;
                writeln!(f, "These interests are automatically detected from your messages.")
            }
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Server-supplied message for rejections, `fallback` for everything else.
fn alert_text(error: &ApiError, fallback: &str) -> String {
    match error {
        ApiError::Rejected(message) => message.clone(),
        _ => fallback.to_owned(),
    }
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
