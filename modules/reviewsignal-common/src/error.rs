use thiserror::Error;

/// Why a single record could not be scored. Recovered locally: the record is
/// skipped (or scored neutral, for scorer failures) and the batch continues.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("record has no `{field}` field")]
    MissingText { field: String },

    #[error("field `{field}` is {found}, expected a string")]
    NotText { field: String, found: &'static str },

    #[error("malformed row: {0}")]
    Malformed(String),

    #[error("scorer failed, scored neutral: {0}")]
    ScorerFailed(String),
}

impl RecordError {
    /// Scorer failures still produce a (neutral) scored record; everything
    /// else drops the record from the batch.
    pub fn drops_record(&self) -> bool {
        !matches!(self, RecordError::ScorerFailed(_))
    }
}

/// Caller-side misconfiguration. Surfaced immediately, never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("unsupported source kind: {0}")]
    UnsupportedSourceKind(String),

    #[error("no adapter registered for source kind: {0}")]
    AdapterUnavailable(String),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("{0} environment variable is required")]
    MissingEnv(String),
}
