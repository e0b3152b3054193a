use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, SecondsFormat, Utc};

use crate::types::BatchId;

/// Supplies a fresh id for each ingestion run.
pub trait BatchIdGenerator: Send + Sync {
    fn next_id(&self) -> BatchId;
}

/// `batch_<RFC3339 timestamp, microseconds>`. Strictly increasing within the
/// process even if the wall clock stalls or steps backwards.
#[derive(Debug, Default)]
pub struct ClockBatchIds {
    last_micros: AtomicI64,
}

impl ClockBatchIds {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_micros(&self) -> i64 {
        let now = Utc::now().timestamp_micros();
        let mut last = self.last_micros.load(Ordering::Relaxed);
        loop {
            let next = now.max(last + 1);
            match self.last_micros.compare_exchange_weak(
                last,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(actual) => last = actual,
            }
        }
    }
}

impl BatchIdGenerator for ClockBatchIds {
    fn next_id(&self) -> BatchId {
        let micros = self.next_micros();
        let at = DateTime::<Utc>::from_timestamp_micros(micros).unwrap_or_else(Utc::now);
        BatchId::new(format!(
            "batch_{}",
            at.to_rfc3339_opts(SecondsFormat::Micros, true)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn ids_have_batch_prefix() {
        let id = ClockBatchIds::new().next_id();
        assert!(id.as_str().starts_with("batch_"));
        assert!(id.as_str().ends_with('Z'));
    }

    #[test]
    fn ids_strictly_increase_in_a_tight_loop() {
        let ids = ClockBatchIds::new();
        let generated: Vec<_> = (0..500).map(|_| ids.next_id()).collect();
        for pair in generated.windows(2) {
            assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn ids_are_unique_across_threads() {
        let ids = Arc::new(ClockBatchIds::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ids = ids.clone();
                std::thread::spawn(move || (0..200).map(|_| ids.next_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id));
            }
        }
        assert_eq!(seen.len(), 800);
    }
}
