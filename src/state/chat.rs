//! Chat message views and sentiment iconography.

#[cfg(test)]
#[path = "chat_test.rs"]
mod chat_test;

/// Scores above this are shown as positive.
pub const POSITIVE_THRESHOLD: f64 = 0.2;
/// Scores below this are shown as negative.
pub const NEGATIVE_THRESHOLD: f64 = -0.2;

/// Display bucket for a message's sentiment score.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SentimentClass {
    Positive,
    Neutral,
    Negative,
}

impl SentimentClass {
    /// Classify with strict thresholds; boundary values are neutral.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score > POSITIVE_THRESHOLD {
            Self::Positive
        } else if score < NEGATIVE_THRESHOLD {
            Self::Negative
        } else {
            Self::Neutral
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Neutral => "Neutral",
            Self::Negative => "Negative",
        }
    }

    /// Terminal-friendly icon.
    #[must_use]
    pub fn icon(self) -> &'static str {
        match self {
            Self::Positive => ":)",
            Self::Neutral => ":|",
            Self::Negative => ":(",
        }
    }
}

/// A chat message as presented in the message list.
#[derive(Clone, Debug, PartialEq)]
pub struct ChatMessageView {
    pub username: String,
    pub text: String,
    /// Server send time, when the server provided one.
    pub timestamp: Option<String>,
    pub sentiment: Option<f64>,
    /// Sent by this session's identity.
    pub is_own: bool,
}

impl ChatMessageView {
    /// Sentiment bucket, or `None` when the server did not score the message.
    #[must_use]
    pub fn sentiment_class(&self) -> Option<SentimentClass> {
        self.sentiment.map(SentimentClass::from_score)
    }
}

#[must_use]
pub fn joined_notice(username: &str) -> String {
    format!("{username} has joined the room")
}

#[must_use]
pub fn left_notice(username: &str) -> String {
    format!("{username} has left the room")
}
