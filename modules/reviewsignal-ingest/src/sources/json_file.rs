use std::sync::Arc;

use async_trait::async_trait;
use reviewsignal_common::{SourceDescriptor, SourceKind};

use super::{finish_read, records_from_json, RawRow, SourceAdapter, SourceRead};
use crate::error::SourceError;
use crate::observer::IngestObserver;

/// JSON file source: an array of review objects, or an object wrapping one.
pub struct JsonFileSource {
    observer: Arc<dyn IngestObserver>,
}

impl JsonFileSource {
    pub fn new(observer: Arc<dyn IngestObserver>) -> Self {
        Self { observer }
    }

    async fn fetch(&self, descriptor: &SourceDescriptor) -> Result<Vec<RawRow>, SourceError> {
        let path = descriptor.location();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| SourceError::from_io(e, path))?;
        let document = serde_json::from_slice(&bytes)?;
        records_from_json(document, descriptor)
    }
}

#[async_trait]
impl SourceAdapter for JsonFileSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Json
    }

    async fn read(&self, descriptor: &SourceDescriptor) -> SourceRead {
        finish_read(self.observer.as_ref(), descriptor, self.fetch(descriptor).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingObserver;
    use std::io::Write;

    async fn read_str(contents: &str) -> (SourceRead, Arc<RecordingObserver>) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        let observer = Arc::new(RecordingObserver::new());
        let read = JsonFileSource::new(observer.clone())
            .read(&SourceDescriptor::json(file.path().to_string_lossy()))
            .await;
        (read, observer)
    }

    #[tokio::test]
    async fn reads_array_of_objects() {
        let (read, observer) =
            read_str(r#"[{"review_text": "Nice"}, {"review_text": "Meh", "stars": 3}]"#).await;
        assert!(!read.is_failed());
        assert_eq!(read.rows.len(), 2);
        assert!(observer.events().is_empty());
    }

    #[tokio::test]
    async fn reads_wrapped_array() {
        let (read, _) = read_str(r#"{"reviews": [{"review_text": "Nice"}]}"#).await;
        assert_eq!(read.rows.len(), 1);
    }

    #[tokio::test]
    async fn invalid_json_fails_only_this_source() {
        let (read, observer) = read_str(r#"[{"review_text": "unterminated"#).await;
        assert!(read.rows.is_empty());
        assert!(matches!(
            read.failure.map(|f| f.error),
            Some(SourceError::Decode(_))
        ));
        assert_eq!(observer.errors().len(), 1);
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let read = JsonFileSource::new(Arc::new(RecordingObserver::new()))
            .read(&SourceDescriptor::json("/nope/reviews.json"))
            .await;
        assert!(matches!(
            read.failure.map(|f| f.error),
            Some(SourceError::NotFound { .. })
        ));
    }
}
