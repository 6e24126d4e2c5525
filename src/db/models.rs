// Data models: the records that flow through the pipeline and into storage.
//
// These are separate from the storage backends so other modules can use them
// without depending on sqlx. Both backends store and return the same shapes;
// backend-assigned identifiers never leave the backend.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::decision::Classification;

/// Where a classification request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    #[default]
    Direct,
    File,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Direct => "direct",
            Source::File => "file",
        }
    }
}

impl std::str::FromStr for Source {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(Source::Direct),
            "file" => Ok(Source::File),
            other => anyhow::bail!("Unknown record source {other:?}"),
        }
    }
}

/// One classified message. Never mutated after creation.
///
/// Records written before timestamps were tracked deserialize with the Unix
/// epoch, which sorts them after everything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRecord {
    pub text: String,
    pub classification: Classification,
    pub confidence: f64,
    #[serde(default, alias = "toxic_words")]
    pub toxic_signals: Vec<String>,
    #[serde(default)]
    pub has_emoji: bool,
    #[serde(default)]
    pub positive_suggestion: Option<String>,
    #[serde(default)]
    pub rewritten_text: Option<String>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub source: Source,
}

/// A user's correction of a classification.
///
/// Linked to history only by text equality; there is no shared identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub original_text: String,
    #[serde(default)]
    pub original_classification: Option<Classification>,
    #[serde(alias = "correct_classification")]
    pub corrected_classification: Classification,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// RFC 3339, or the offset-less `YYYY-MM-DD HH:MM:SS[.ffffff]` form older
/// fallback files were written with, read as UTC.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| serde::de::Error::custom(format!("invalid timestamp {raw:?}: {e}")))
}

/// The two named collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    History,
    Feedback,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::History, Collection::Feedback];

    pub fn name(&self) -> &'static str {
        match self {
            Collection::History => "history",
            Collection::Feedback => "feedback",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A record of either collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Record {
    Classification(ClassificationRecord),
    Feedback(FeedbackRecord),
}

impl Record {
    pub fn collection(&self) -> Collection {
        match self {
            Record::Classification(_) => Collection::History,
            Record::Feedback(_) => Collection::Feedback,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Record::Classification(r) => r.timestamp,
            Record::Feedback(r) => r.timestamp,
        }
    }

    /// Parse a stored JSON document as a record of the given collection.
    pub fn from_json(collection: Collection, value: serde_json::Value) -> serde_json::Result<Self> {
        match collection {
            Collection::History => serde_json::from_value(value).map(Record::Classification),
            Collection::Feedback => serde_json::from_value(value).map(Record::Feedback),
        }
    }
}

impl From<ClassificationRecord> for Record {
    fn from(record: ClassificationRecord) -> Self {
        Record::Classification(record)
    }
}

impl From<FeedbackRecord> for Record {
    fn from(record: FeedbackRecord) -> Self {
        Record::Feedback(record)
    }
}

/// Sort newest first. Stable, so equal timestamps keep insertion order.
pub fn sort_newest_first(records: &mut [Record]) {
    records.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
}

/// Result of clearing a collection.
///
/// The primary backend knows exactly how many rows it removed. The fallback
/// store reports 0 on success and Unknown when it could not write the empty
/// container; the two must not be conflated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    Deleted(u64),
    Unknown,
}

impl ClearOutcome {
    pub fn deleted_count(&self) -> Option<u64> {
        match self {
            ClearOutcome::Deleted(n) => Some(*n),
            ClearOutcome::Unknown => None,
        }
    }
}

impl std::fmt::Display for ClearOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClearOutcome::Deleted(n) => write!(f, "{n}"),
            ClearOutcome::Unknown => write!(f, "unknown"),
        }
    }
}

impl Serialize for ClearOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ClearOutcome::Deleted(n) => serializer.serialize_u64(*n),
            ClearOutcome::Unknown => serializer.serialize_str("unknown"),
        }
    }
}
