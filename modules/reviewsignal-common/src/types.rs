use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::categorize::categorize;
use crate::error::{ConfigurationError, RecordError};
use crate::scoring::Sentiment;

/// Conventional name of the text field in CSV/JSON/API records.
pub const DEFAULT_TEXT_FIELD: &str = "review_text";

/// Default number of characters kept in `ScoredRecord::text`.
pub const DEFAULT_PREVIEW_CHARS: usize = 100;

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum SourceKind {
    Csv,
    Json,
    Api,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [SourceKind::Csv, SourceKind::Json, SourceKind::Api];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Csv => "csv",
            SourceKind::Json => "json",
            SourceKind::Api => "api",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(SourceKind::Csv),
            "json" => Ok(SourceKind::Json),
            "api" => Ok(SourceKind::Api),
            other => Err(ConfigurationError::UnsupportedSourceKind(other.to_string())),
        }
    }
}

impl TryFrom<String> for SourceKind {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Where to read reviews from. `location` is a file path for CSV/JSON and a
/// URL for API sources. The credential is only ever sent as a bearer token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    #[serde(rename = "type")]
    kind: SourceKind,
    #[serde(rename = "path")]
    location: String,
    #[serde(rename = "api_key", default, skip_serializing)]
    credential: Option<String>,
}

impl SourceDescriptor {
    pub fn new(kind: SourceKind, location: impl Into<String>, credential: Option<String>) -> Self {
        Self {
            kind,
            location: location.into(),
            credential: credential.filter(|c| !c.is_empty()),
        }
    }

    pub fn csv(path: impl Into<String>) -> Self {
        Self::new(SourceKind::Csv, path, None)
    }

    pub fn json(path: impl Into<String>) -> Self {
        Self::new(SourceKind::Json, path, None)
    }

    pub fn api(url: impl Into<String>, credential: Option<String>) -> Self {
        Self::new(SourceKind::Api, url, credential)
    }

    /// Parse a descriptor from loosely-typed input, e.g. CLI flags.
    pub fn parse(
        kind: &str,
        location: impl Into<String>,
        credential: Option<String>,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self::new(kind.parse()?, location, credential))
    }

    /// Load a descriptor list: `[{"type": "csv", "path": "...", "api_key": "..."}]`.
    pub fn list_from_json(json: &str) -> Result<Vec<Self>, ConfigurationError> {
        let list: Vec<Self> =
            serde_json::from_str(json).map_err(|e| ConfigurationError::InvalidValue {
                key: "sources".into(),
                value: e.to_string(),
            })?;
        Ok(list
            .into_iter()
            .map(|d| Self::new(d.kind, d.location, d.credential))
            .collect())
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }
}

// Keep credentials out of logs.
impl fmt::Debug for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceDescriptor")
            .field("kind", &self.kind)
            .field("location", &self.location)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.location)
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One parsed row/object, fields in source order. `index` is the position
/// of the row within its source (0-based, header excluded).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawRecord {
    pub index: usize,
    pub fields: Map<String, Value>,
}

impl RawRecord {
    pub fn new(index: usize, fields: Map<String, Value>) -> Self {
        Self { index, fields }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// The text to score. `null` counts as missing; an empty string is valid.
    pub fn text(&self, field: &str) -> Result<&str, RecordError> {
        match self.fields.get(field) {
            None | Some(Value::Null) => Err(RecordError::MissingText {
                field: field.to_string(),
            }),
            Some(Value::String(text)) => Ok(text),
            Some(other) => Err(RecordError::NotText {
                field: field.to_string(),
                found: json_type_name(other),
            }),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentCategory {
    VeryPositive,
    Positive,
    Neutral,
    Negative,
    VeryNegative,
}

impl SentimentCategory {
    pub const ALL: [SentimentCategory; 5] = [
        SentimentCategory::VeryPositive,
        SentimentCategory::Positive,
        SentimentCategory::Neutral,
        SentimentCategory::Negative,
        SentimentCategory::VeryNegative,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentCategory::VeryPositive => "very_positive",
            SentimentCategory::Positive => "positive",
            SentimentCategory::Neutral => "neutral",
            SentimentCategory::Negative => "negative",
            SentimentCategory::VeryNegative => "very_negative",
        }
    }

    /// Position in `ALL`.
    pub fn ordinal(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for SentimentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SentimentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SentimentCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown sentiment category: {s}"))
    }
}

/// Identifies one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(String);

impl BatchId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A scored review. Fields are read-only; the category is always derived
/// from the polarity at construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRecord {
    text: String,
    source_kind: SourceKind,
    polarity: f64,
    subjectivity: f64,
    category: SentimentCategory,
    batch_id: BatchId,
    created_at: DateTime<Utc>,
}

impl ScoredRecord {
    pub fn new(
        text: &str,
        source_kind: SourceKind,
        sentiment: Sentiment,
        batch_id: BatchId,
        preview_chars: usize,
    ) -> Self {
        Self {
            text: preview(text, preview_chars),
            source_kind,
            polarity: sentiment.polarity,
            subjectivity: sentiment.subjectivity,
            category: categorize(sentiment.polarity),
            batch_id,
            created_at: Utc::now(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source_kind
    }

    pub fn polarity(&self) -> f64 {
        self.polarity
    }

    pub fn subjectivity(&self) -> f64 {
        self.subjectivity
    }

    pub fn category(&self) -> SentimentCategory {
        self.category
    }

    pub fn batch_id(&self) -> &BatchId {
        &self.batch_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// First `max_chars` characters of `text`, never splitting a char.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}
