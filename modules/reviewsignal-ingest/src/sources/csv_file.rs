// CSV file source. First row is the header; a row that does not parse or
// has the wrong number of fields is skipped on its own.

use std::sync::Arc;

use async_trait::async_trait;
use reviewsignal_common::{RawRecord, RecordError, SourceDescriptor, SourceKind};
use serde_json::{Map, Value};

use super::{finish_read, RawRow, SourceAdapter, SourceRead};
use crate::error::{RecordFailure, SourceError};
use crate::observer::IngestObserver;

pub struct CsvSource {
    observer: Arc<dyn IngestObserver>,
}

impl CsvSource {
    pub fn new(observer: Arc<dyn IngestObserver>) -> Self {
        Self { observer }
    }

    async fn fetch(&self, descriptor: &SourceDescriptor) -> Result<Vec<RawRow>, SourceError> {
        let path = descriptor.location();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| SourceError::from_io(e, path))?;
        parse_csv(&bytes, descriptor)
    }
}

pub(crate) fn parse_csv(bytes: &[u8], descriptor: &SourceDescriptor) -> Result<Vec<RawRow>, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();

    Ok(reader
        .records()
        .enumerate()
        .map(|(index, row)| match row {
            Ok(row) => {
                let fields: Map<String, Value> = headers
                    .iter()
                    .zip(row.iter())
                    .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
                    .collect();
                Ok(RawRecord::new(index, fields))
            }
            Err(e) => Err(RecordFailure::new(
                descriptor,
                index,
                RecordError::Malformed(e.to_string()),
            )),
        })
        .collect())
}

#[async_trait]
impl SourceAdapter for CsvSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Csv
    }

    async fn read(&self, descriptor: &SourceDescriptor) -> SourceRead {
        finish_read(self.observer.as_ref(), descriptor, self.fetch(descriptor).await)
    }
}
