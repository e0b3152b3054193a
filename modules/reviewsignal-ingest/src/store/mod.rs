//! Persistence collaborator. Append-only: the ingest path never updates or
//! deletes stored reviews.

mod postgres;

pub use postgres::PgReviewStore;

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use reviewsignal_common::{summarize, BatchId, BatchSummary, ScoredRecord};

use crate::error::PersistenceError;

#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn append(&self, record: &ScoredRecord) -> Result<(), PersistenceError>;

    /// Category counts for one batch, all five categories present.
    async fn count_by_batch_and_category(
        &self,
        batch_id: &BatchId,
    ) -> Result<BatchSummary, PersistenceError>;
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryReviewStore {
    records: Mutex<Vec<ScoredRecord>>,
}

impl MemoryReviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything appended so far, in append order.
    pub fn records(&self) -> Vec<ScoredRecord> {
        self.lock().clone()
    }

    // Every critical section is a single push or read, so a poisoned vector
    // is still consistent.
    fn lock(&self) -> MutexGuard<'_, Vec<ScoredRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ReviewStore for MemoryReviewStore {
    async fn append(&self, record: &ScoredRecord) -> Result<(), PersistenceError> {
        self.lock().push(record.clone());
        Ok(())
    }

    async fn count_by_batch_and_category(
        &self,
        batch_id: &BatchId,
    ) -> Result<BatchSummary, PersistenceError> {
        let records = self.lock();
        Ok(summarize(records.iter().filter(|r| r.batch_id() == batch_id)))
    }
}
