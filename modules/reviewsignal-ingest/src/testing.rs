// Test doubles for the ingest pipeline, one per collaborator seam, plus
// builders for raw rows.
//
//   StubScorer / FailingScorer   SentimentScorer
//   RecordingObserver            IngestObserver
//   StaticSource                 SourceAdapter (canned rows, no I/O)
//   FailingStore                 ReviewStore (rejects chosen texts)
//   FixedBatchIds                BatchIdGenerator

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reviewsignal_common::{
    summarize, BatchId, BatchIdGenerator, BatchSummary, RawRecord, ScoreError, ScoredRecord,
    Sentiment, SentimentScorer, SourceDescriptor, SourceKind,
};
use serde_json::{json, Value};

use crate::error::{PersistenceError, SourceError};
use crate::observer::{IngestEvent, IngestObserver, TracingObserver};
use crate::sources::{finish_read, RawRow, SourceAdapter, SourceRead};
use crate::store::ReviewStore;

// ---------------------------------------------------------------------------
// Scorers
// ---------------------------------------------------------------------------

/// Returns the registered polarity for a text (subjectivity 0.5), and the
/// neutral pair for anything unregistered.
#[derive(Default)]
pub struct StubScorer {
    polarities: HashMap<String, f64>,
}

impl StubScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, text: &str, polarity: f64) -> Self {
        self.polarities.insert(text.to_string(), polarity);
        self
    }
}

impl SentimentScorer for StubScorer {
    fn score(&self, text: &str) -> Result<Sentiment, ScoreError> {
        Ok(match self.polarities.get(text) {
            Some(&polarity) => Sentiment::new(polarity, 0.5),
            None => Sentiment::NEUTRAL,
        })
    }
}

/// Fails on every input.
pub struct FailingScorer;

impl SentimentScorer for FailingScorer {
    fn score(&self, _text: &str) -> Result<Sentiment, ScoreError> {
        Err(ScoreError::Rejected("stub failure".into()))
    }
}

// ---------------------------------------------------------------------------
// RecordingObserver
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Warning,
    Error,
}

#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<(Level, IngestEvent)>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(Level, IngestEvent)> {
        self.events.lock().unwrap().clone()
    }

    pub fn warnings(&self) -> Vec<IngestEvent> {
        self.at(Level::Warning)
    }

    pub fn errors(&self) -> Vec<IngestEvent> {
        self.at(Level::Error)
    }

    fn at(&self, level: Level) -> Vec<IngestEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, e)| e.clone())
            .collect()
    }
}

impl IngestObserver for RecordingObserver {
    fn warning(&self, event: &IngestEvent) {
        self.events
            .lock()
            .unwrap()
            .push((Level::Warning, event.clone()));
    }

    fn error(&self, event: &IngestEvent) {
        self.events.lock().unwrap().push((Level::Error, event.clone()));
    }
}

// ---------------------------------------------------------------------------
// StaticSource
// ---------------------------------------------------------------------------

/// Adapter serving canned rows per location. Unregistered locations fail
/// with `NotFound`. Reports through `TracingObserver` unless given one.
pub struct StaticSource {
    kind: SourceKind,
    observer: Arc<dyn IngestObserver>,
    rows: HashMap<String, Vec<RawRow>>,
    failures: HashMap<String, SourceError>,
}

impl StaticSource {
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            observer: Arc::new(TracingObserver),
            rows: HashMap::new(),
            failures: HashMap::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn IngestObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn on(mut self, location: &str, rows: Vec<RawRow>) -> Self {
        self.rows.insert(location.to_string(), rows);
        self
    }

    pub fn failing(mut self, location: &str, error: SourceError) -> Self {
        self.failures.insert(location.to_string(), error);
        self
    }
}

#[async_trait]
impl SourceAdapter for StaticSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn read(&self, descriptor: &SourceDescriptor) -> SourceRead {
        let location = descriptor.location();
        let fetched = match (self.rows.get(location), self.failures.get(location)) {
            (_, Some(error)) => Err(error.clone()),
            (Some(rows), None) => Ok(rows.clone()),
            (None, None) => Err(SourceError::NotFound {
                path: location.to_string(),
            }),
        };
        finish_read(self.observer.as_ref(), descriptor, fetched)
    }
}

// ---------------------------------------------------------------------------
// FailingStore
// ---------------------------------------------------------------------------

/// Rejects appends whose text is in the failing set; stores everything else.
#[derive(Default)]
pub struct FailingStore {
    failing: HashSet<String>,
    appended: Mutex<Vec<ScoredRecord>>,
}

impl FailingStore {
    pub fn failing_on(texts: &[&str]) -> Self {
        Self {
            failing: texts.iter().map(|t| t.to_string()).collect(),
            appended: Mutex::new(Vec::new()),
        }
    }

    pub fn appended(&self) -> Vec<ScoredRecord> {
        self.appended.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReviewStore for FailingStore {
    async fn append(&self, record: &ScoredRecord) -> Result<(), PersistenceError> {
        if self.failing.contains(record.text()) {
            return Err(PersistenceError::Unavailable("stub refused write".into()));
        }
        self.appended.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn count_by_batch_and_category(
        &self,
        batch_id: &BatchId,
    ) -> Result<BatchSummary, PersistenceError> {
        let appended = self.appended.lock().unwrap();
        Ok(summarize(appended.iter().filter(|r| r.batch_id() == batch_id)))
    }
}

// ---------------------------------------------------------------------------
// Batch ids
// ---------------------------------------------------------------------------

pub struct FixedBatchIds(BatchId);

impl FixedBatchIds {
    pub fn new(id: &str) -> Self {
        Self(BatchId::new(id))
    }
}

impl BatchIdGenerator for FixedBatchIds {
    fn next_id(&self) -> BatchId {
        self.0.clone()
    }
}

// ---------------------------------------------------------------------------
// Row builders
// ---------------------------------------------------------------------------

/// A raw row from a JSON object literal.
pub fn raw_row(index: usize, value: Value) -> RawRow {
    match value {
        Value::Object(fields) => Ok(RawRecord::new(index, fields)),
        other => panic!("raw_row needs an object, got {other}"),
    }
}

/// One `{"review_text": ..}` row per text.
pub fn review_rows(texts: &[&str]) -> Vec<RawRow> {
    texts
        .iter()
        .enumerate()
        .map(|(index, text)| raw_row(index, json!({ "review_text": text })))
        .collect()
}
