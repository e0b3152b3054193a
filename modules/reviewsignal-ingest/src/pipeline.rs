// Scores the rows of one source, in order.
//
// Row → text field → scorer (failures become neutral) → categorizer →
// ScoredRecord → optional append to the store. A bad row, a scorer failure
// or a failed append affects only that record.

use std::sync::Arc;

use reviewsignal_common::{
    score_or_neutral, BatchId, RecordError, ScoredRecord, SentimentScorer, SourceDescriptor,
    DEFAULT_PREVIEW_CHARS, DEFAULT_TEXT_FIELD,
};
use tracing::debug;

use crate::error::{PersistenceFailure, RecordFailure};
use crate::observer::{IngestEvent, IngestObserver};
use crate::sources::RawRow;
use crate::store::ReviewStore;

/// Output of one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineRun {
    /// Scored records, same order as the input rows.
    pub records: Vec<ScoredRecord>,
    /// Skipped rows plus records scored neutral after a scorer failure.
    pub record_failures: Vec<RecordFailure>,
    pub persistence_failures: Vec<PersistenceFailure>,
    pub persisted: usize,
}

impl PipelineRun {
    /// Rows that produced no scored record.
    pub fn skipped(&self) -> usize {
        self.record_failures
            .iter()
            .filter(|f| f.error.drops_record())
            .count()
    }
}

#[derive(Clone)]
pub struct ReviewPipeline {
    scorer: Arc<dyn SentimentScorer>,
    observer: Arc<dyn IngestObserver>,
    store: Option<Arc<dyn ReviewStore>>,
    text_field: String,
    preview_chars: usize,
}

impl ReviewPipeline {
    pub fn new(scorer: Arc<dyn SentimentScorer>, observer: Arc<dyn IngestObserver>) -> Self {
        Self {
            scorer,
            observer,
            store: None,
            text_field: DEFAULT_TEXT_FIELD.to_string(),
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn ReviewStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_text_field(mut self, field: impl Into<String>) -> Self {
        self.text_field = field.into();
        self
    }

    pub fn with_preview_chars(mut self, chars: usize) -> Self {
        self.preview_chars = chars;
        self
    }

    pub fn text_field(&self) -> &str {
        &self.text_field
    }

    /// Score every row from `source` under `batch_id`. Never fails; problems
    /// are reported to the observer and returned in the run.
    pub async fn run<I>(&self, source: &SourceDescriptor, rows: I, batch_id: &BatchId) -> PipelineRun
    where
        I: IntoIterator<Item = RawRow>,
    {
        let mut run = PipelineRun::default();

        for row in rows {
            // Adapters have already reported their malformed rows.
            let raw = match row {
                Ok(raw) => raw,
                Err(failure) => {
                    run.record_failures.push(failure);
                    continue;
                }
            };

            let text = match raw.text(&self.text_field) {
                Ok(text) => text,
                Err(error) => {
                    let failure = RecordFailure::new(source, raw.index, error);
                    self.observer
                        .warning(&IngestEvent::RecordSkipped(failure.clone()));
                    run.record_failures.push(failure);
                    continue;
                }
            };

            let (sentiment, score_error) = score_or_neutral(self.scorer.as_ref(), text);
            if let Some(e) = score_error {
                let failure =
                    RecordFailure::new(source, raw.index, RecordError::ScorerFailed(e.to_string()));
                self.observer
                    .warning(&IngestEvent::ScoredNeutral(failure.clone()));
                run.record_failures.push(failure);
            }

            let record = ScoredRecord::new(
                text,
                source.kind(),
                sentiment,
                batch_id.clone(),
                self.preview_chars,
            );

            if let Some(store) = &self.store {
                match store.append(&record).await {
                    Ok(()) => run.persisted += 1,
                    Err(error) => {
                        let failure = PersistenceFailure {
                            source: source.clone(),
                            index: raw.index,
                            batch_id: batch_id.clone(),
                            error,
                        };
                        self.observer
                            .error(&IngestEvent::PersistFailed(failure.clone()));
                        run.persistence_failures.push(failure);
                    }
                }
            }

            run.records.push(record);
        }

        debug!(
            source = %source,
            batch_id = %batch_id,
            scored = run.records.len(),
            skipped = run.skipped(),
            persisted = run.persisted,
            "Pipeline run complete"
        );

        run
    }
}
