use std::fmt::Display;

use reviewsignal_common::{BatchId, ConfigurationError, RecordError, SourceDescriptor};
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Result type alias for ingest operations.
pub type Result<T> = std::result::Result<T, IngestError>;

/// A whole source could not be read. That source contributes zero records;
/// sibling sources are unaffected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("file not found: {path}")]
    NotFound { path: String },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("unexpected document shape: {0}")]
    InvalidShape(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("network error: {0}")]
    Network(String),
}

impl SourceError {
    pub(crate) fn from_io(err: std::io::Error, path: &str) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => SourceError::NotFound {
                path: path.to_string(),
            },
            _ => SourceError::Io(format!("{path}: {err}")),
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout(err.to_string())
        } else if err.is_connect() {
            SourceError::Connection(err.to_string())
        } else {
            SourceError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Decode(err.to_string())
    }
}

impl From<csv::Error> for SourceError {
    fn from(err: csv::Error) -> Self {
        SourceError::Decode(err.to_string())
    }
}

/// The store rejected a write or a query.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Database(String),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt stored value: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for PersistenceError {
    fn from(err: sqlx::Error) -> Self {
        PersistenceError::Database(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for PersistenceError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        PersistenceError::Migration(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("all {failed} sources failed")]
    AllSourcesFailed { failed: usize },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

// ---------------------------------------------------------------------------
// Failure reports
// ---------------------------------------------------------------------------

/// One record that was skipped, or scored neutral after a scorer failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordFailure {
    pub source: SourceDescriptor,
    pub index: usize,
    #[serde(serialize_with = "as_display")]
    pub error: RecordError,
}

impl RecordFailure {
    pub fn new(source: &SourceDescriptor, index: usize, error: RecordError) -> Self {
        Self {
            source: source.clone(),
            index,
            error,
        }
    }
}

/// A source that contributed nothing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceFailure {
    pub source: SourceDescriptor,
    #[serde(serialize_with = "as_display")]
    pub error: SourceError,
}

/// A scored record that could not be appended to the store. It is still
/// counted in the in-memory summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistenceFailure {
    pub source: SourceDescriptor,
    pub index: usize,
    pub batch_id: BatchId,
    #[serde(serialize_with = "as_display")]
    pub error: PersistenceError,
}

pub(crate) fn as_display<T: Display, S: Serializer>(
    value: &T,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn failure_reports_share_one_source_shape() {
        let source = SourceDescriptor::api("https://x.test/reviews", Some("s3cret".into()));
        let expected = json!({"type": "api", "path": "https://x.test/reviews"});

        let record = RecordFailure::new(&source, 2, RecordError::Malformed("bad".into()));
        let failed = SourceFailure {
            source: source.clone(),
            error: SourceError::Timeout("slow".into()),
        };
        let persist = PersistenceFailure {
            source: source.clone(),
            index: 3,
            batch_id: BatchId::new("batch_1"),
            error: PersistenceError::Unavailable("down".into()),
        };

        for value in [
            serde_json::to_value(&record).unwrap(),
            serde_json::to_value(&failed).unwrap(),
            serde_json::to_value(&persist).unwrap(),
        ] {
            assert_eq!(value["source"], expected);
        }
        assert_eq!(
            serde_json::to_value(&record).unwrap()["error"],
            "malformed row: bad"
        );
    }
}
