//! Source adapters: CSV files, JSON files and HTTP APIs.
//!
//! Every adapter turns a [`SourceDescriptor`] into an ordered list of rows.
//! Reads never fail outward: a source-level error becomes an empty
//! [`SourceRead`] carrying the [`SourceFailure`], already reported to the
//! observer, so the coordinator can carry on with the next source.

mod csv_file;
mod http_api;
mod json_file;

pub use csv_file::CsvSource;
pub use http_api::ApiSource;
pub use json_file::JsonFileSource;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reviewsignal_common::{
    ConfigurationError, RawRecord, RecordError, SourceDescriptor, SourceKind,
};
use serde_json::Value;
use tracing::info;

use crate::error::{RecordFailure, SourceError, SourceFailure};
use crate::observer::{IngestEvent, IngestObserver};

/// One parsed row, or the reason that row was unusable.
pub type RawRow = Result<RawRecord, RecordFailure>;

/// Outcome of reading one source.
#[derive(Debug, Clone, Default)]
pub struct SourceRead {
    pub rows: Vec<RawRow>,
    pub failure: Option<SourceFailure>,
}

impl SourceRead {
    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Read every row from `descriptor`. A fresh call re-reads the source.
    async fn read(&self, descriptor: &SourceDescriptor) -> SourceRead;
}

/// Turn a fetch result into a `SourceRead`, reporting the source failure or
/// each malformed row to the observer.
pub(crate) fn finish_read(
    observer: &dyn IngestObserver,
    descriptor: &SourceDescriptor,
    fetched: Result<Vec<RawRow>, SourceError>,
) -> SourceRead {
    match fetched {
        Ok(rows) => {
            let mut malformed = 0usize;
            for row in &rows {
                if let Err(failure) = row {
                    malformed += 1;
                    observer.warning(&IngestEvent::RecordSkipped(failure.clone()));
                }
            }
            info!(
                source = %descriptor,
                rows = rows.len() - malformed,
                malformed,
                "Source read"
            );
            SourceRead {
                rows,
                failure: None,
            }
        }
        Err(error) => {
            let failure = SourceFailure {
                source: descriptor.clone(),
                error,
            };
            observer.error(&IngestEvent::SourceFailed(failure.clone()));
            SourceRead {
                rows: Vec::new(),
                failure: Some(failure),
            }
        }
    }
}

/// Records from a JSON document: either a top-level array of objects, or an
/// object whose first array-valued field holds them. Non-object elements are
/// malformed rows; any other document shape fails the whole source.
pub(crate) fn records_from_json(
    document: Value,
    descriptor: &SourceDescriptor,
) -> Result<Vec<RawRow>, SourceError> {
    let items = match document {
        Value::Array(items) => items,
        Value::Object(fields) => fields
            .into_iter()
            .find_map(|(_, value)| match value {
                Value::Array(items) => Some(items),
                _ => None,
            })
            .ok_or_else(|| {
                SourceError::InvalidShape("object contains no array of records".into())
            })?,
        other => {
            return Err(SourceError::InvalidShape(format!(
                "expected an array or object, found {}",
                json_kind(&other)
            )))
        }
    };

    Ok(items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(fields) => Ok(RawRecord::new(index, fields)),
            other => Err(RecordFailure::new(
                descriptor,
                index,
                RecordError::Malformed(format!("expected an object, found {}", json_kind(&other))),
            )),
        })
        .collect())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// AdapterSet
// ---------------------------------------------------------------------------

/// Adapters by source kind.
#[derive(Clone, Default)]
pub struct AdapterSet {
    adapters: HashMap<SourceKind, Arc<dyn SourceAdapter>>,
}

impl AdapterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// CSV, JSON and API adapters sharing one observer. `api_timeout` bounds
    /// every HTTP request.
    pub fn standard(
        observer: Arc<dyn IngestObserver>,
        api_timeout: Duration,
    ) -> Result<Self, SourceError> {
        Ok(Self::new()
            .with(Arc::new(CsvSource::new(observer.clone())))
            .with(Arc::new(JsonFileSource::new(observer.clone())))
            .with(Arc::new(ApiSource::new(observer, api_timeout)?)))
    }

    pub fn with(mut self, adapter: Arc<dyn SourceAdapter>) -> Self {
        self.adapters.insert(adapter.kind(), adapter);
        self
    }

    pub fn get(&self, kind: SourceKind) -> Result<&Arc<dyn SourceAdapter>, ConfigurationError> {
        self.adapters
            .get(&kind)
            .ok_or_else(|| ConfigurationError::AdapterUnavailable(kind.to_string()))
    }
}
