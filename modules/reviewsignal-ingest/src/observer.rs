// Observability collaborator. Adapters, the pipeline and the coordinator
// report through this instead of a process-wide logger, so tests can assert
// on exactly what was reported.

use tracing::{error, warn};

use crate::error::{PersistenceFailure, RecordFailure, SourceFailure};

#[derive(Debug, Clone, PartialEq)]
pub enum IngestEvent {
    /// A row/object was dropped (malformed, missing or non-text field).
    RecordSkipped(RecordFailure),
    /// The scorer failed; the record was kept with the neutral pair.
    ScoredNeutral(RecordFailure),
    /// A source contributed no records.
    SourceFailed(SourceFailure),
    /// A scored record could not be persisted.
    PersistFailed(PersistenceFailure),
    /// Every source of a multi-source run failed.
    AllSourcesFailed { failed: usize },
}

pub trait IngestObserver: Send + Sync {
    fn warning(&self, event: &IngestEvent);
    fn error(&self, event: &IngestEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TracingObserver {
    fn emit(&self, event: &IngestEvent, is_error: bool) {
        macro_rules! log {
            ($($arg:tt)+) => {
                if is_error { error!($($arg)+) } else { warn!($($arg)+) }
            };
        }

        match event {
            IngestEvent::RecordSkipped(f) => log!(
                source = %f.source,
                index = f.index,
                error = %f.error,
                "Record skipped"
            ),
            IngestEvent::ScoredNeutral(f) => log!(
                source = %f.source,
                index = f.index,
                error = %f.error,
                "Scorer failed, record scored neutral"
            ),
            IngestEvent::SourceFailed(f) => log!(
                source = %f.source,
                error = %f.error,
                "Source read failed"
            ),
            IngestEvent::PersistFailed(f) => log!(
                source = %f.source,
                index = f.index,
                batch_id = %f.batch_id,
                error = %f.error,
                "Failed to persist scored review"
            ),
            IngestEvent::AllSourcesFailed { failed } => {
                log!(failed, "Every source failed; summary is empty")
            }
        }
    }
}

impl IngestObserver for TracingObserver {
    fn warning(&self, event: &IngestEvent) {
        self.emit(event, false);
    }

    fn error(&self, event: &IngestEvent) {
        self.emit(event, true);
    }
}
