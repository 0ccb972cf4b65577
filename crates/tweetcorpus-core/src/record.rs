//! Record types flowing from the corpus file to the output file

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hand-assigned sentiment label of a corpus entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    Irrelevant,
}

impl Sentiment {
    pub const ALL: [Sentiment; 4] = [
        Self::Positive,
        Self::Negative,
        Self::Neutral,
        Self::Irrelevant,
    ];

    /// Parse a corpus label.
    ///
    /// The first character is upper-cased and the remainder kept as-is, so
    /// `positive` and `Positive` are accepted while `POSITIVE` is not.
    pub fn from_label(s: &str) -> Option<Self> {
        let mut chars = s.trim().chars();
        let first = chars.next()?;
        let normalized: String = first.to_uppercase().chain(chars).collect();
        match normalized.as_str() {
            "Positive" => Some(Self::Positive),
            "Negative" => Some(Self::Negative),
            "Neutral" => Some(Self::Neutral),
            "Irrelevant" => Some(Self::Irrelevant),
            _ => None,
        }
    }

    /// Lowercase label used in the output file
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
            Self::Irrelevant => "irrelevant",
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the input corpus.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorpusRecord {
    pub id: i64,
    pub keyword: String,
    pub sentiment: Sentiment,
}

/// Fields consumed from a fetched tweet
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TweetPayload {
    pub created_at: DateTime<Utc>,
    pub language: String,
    pub author_handle: String,
    pub text: String,
}

/// A corpus record joined with its fetched tweet.
///
/// Only built after a successful fetch; written once and dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinedRecord {
    pub record: CorpusRecord,
    pub tweet: TweetPayload,
}

impl JoinedRecord {
    pub fn new(record: CorpusRecord, tweet: TweetPayload) -> Self {
        Self { record, tweet }
    }

    pub fn id(&self) -> i64 {
        self.record.id
    }
}
