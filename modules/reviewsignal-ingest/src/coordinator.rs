// Runs the pipeline over a list of heterogeneous sources and merges their
// summaries.
//
// One batch id per call, shared by every source. A failed source is reported
// and contributes zero; the call itself only fails on configuration errors,
// which are checked before any source is touched.

use std::sync::Arc;

use futures::future::join_all;
use reviewsignal_common::{
    summarize, BatchId, BatchIdGenerator, BatchSummary, ConfigurationError, ScoredRecord,
    SourceDescriptor,
};
use serde::Serialize;
use tracing::info;

use crate::error::{IngestError, PersistenceFailure, RecordFailure, SourceError, SourceFailure};
use crate::observer::{IngestEvent, IngestObserver};
use crate::pipeline::{PipelineRun, ReviewPipeline};
use crate::sources::{AdapterSet, SourceRead};

/// Per-source result line of a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceOutcome {
    pub source: SourceDescriptor,
    pub scored: usize,
    pub skipped: usize,
    #[serde(serialize_with = "error_text")]
    pub error: Option<SourceError>,
    pub summary: BatchSummary,
}

impl SourceOutcome {
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

fn error_text<S: serde::Serializer>(
    error: &Option<SourceError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.collect_str(e),
        None => serializer.serialize_none(),
    }
}

/// Everything one `process` call produced.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub batch_id: BatchId,
    pub summary: BatchSummary,
    #[serde(skip)]
    pub records: Vec<ScoredRecord>,
    pub sources: Vec<SourceOutcome>,
    pub record_failures: Vec<RecordFailure>,
    pub persistence_failures: Vec<PersistenceFailure>,
}

impl IngestReport {
    fn empty(batch_id: BatchId) -> Self {
        Self {
            batch_id,
            summary: BatchSummary::new(),
            records: Vec::new(),
            sources: Vec::new(),
            record_failures: Vec::new(),
            persistence_failures: Vec::new(),
        }
    }

    pub fn failed_sources(&self) -> Vec<SourceFailure> {
        self.sources
            .iter()
            .filter_map(|o| {
                o.error.clone().map(|error| SourceFailure {
                    source: o.source.clone(),
                    error,
                })
            })
            .collect()
    }

    /// True when at least one source was given and none of them could be read.
    pub fn all_sources_failed(&self) -> bool {
        !self.sources.is_empty() && self.sources.iter().all(SourceOutcome::is_failed)
    }

    /// Error when the run had sources and none of them could be read.
    pub fn ensure_any_source_read(&self) -> Result<(), IngestError> {
        if self.all_sources_failed() {
            return Err(IngestError::AllSourcesFailed {
                failed: self.sources.len(),
            });
        }
        Ok(())
    }

    /// The first `n` scored records.
    pub fn sample(&self, n: usize) -> &[ScoredRecord] {
        &self.records[..n.min(self.records.len())]
    }

    /// JSON view of the report with the first `sample_size` records inlined.
    pub fn to_json(&self, sample_size: usize) -> serde_json::Result<serde_json::Value> {
        let mut value = serde_json::to_value(self)?;
        if let Some(object) = value.as_object_mut() {
            object.insert(
                "sample_records".to_string(),
                serde_json::to_value(self.sample(sample_size))?,
            );
        }
        Ok(value)
    }

    fn absorb(&mut self, source: &SourceDescriptor, read: SourceRead, run: PipelineRun) {
        let summary = summarize(&run.records);
        self.summary.merge(&summary);
        let skipped = run.skipped();
        self.sources.push(SourceOutcome {
            source: source.clone(),
            scored: run.records.len(),
            skipped,
            error: read.failure.map(|f| f.error),
            summary,
        });
        self.records.extend(run.records);
        self.record_failures.extend(run.record_failures);
        self.persistence_failures.extend(run.persistence_failures);
    }
}

pub struct MultiSourceCoordinator {
    adapters: AdapterSet,
    pipeline: ReviewPipeline,
    batch_ids: Arc<dyn BatchIdGenerator>,
    observer: Arc<dyn IngestObserver>,
    concurrent: bool,
}

impl MultiSourceCoordinator {
    pub fn new(
        adapters: AdapterSet,
        pipeline: ReviewPipeline,
        batch_ids: Arc<dyn BatchIdGenerator>,
        observer: Arc<dyn IngestObserver>,
    ) -> Self {
        Self {
            adapters,
            pipeline,
            batch_ids,
            observer,
            concurrent: false,
        }
    }

    /// Read sources concurrently. Results are merged in descriptor order, so
    /// the report matches a sequential run.
    pub fn concurrent(mut self, enabled: bool) -> Self {
        self.concurrent = enabled;
        self
    }

    /// Import a single source.
    pub async fn import(
        &self,
        descriptor: &SourceDescriptor,
    ) -> Result<IngestReport, ConfigurationError> {
        self.process(std::slice::from_ref(descriptor)).await
    }

    pub async fn process(
        &self,
        descriptors: &[SourceDescriptor],
    ) -> Result<IngestReport, ConfigurationError> {
        for descriptor in descriptors {
            self.adapters.get(descriptor.kind())?;
        }

        let batch_id = self.batch_ids.next_id();
        info!(batch_id = %batch_id, sources = descriptors.len(), concurrent = self.concurrent, "Ingest started");

        let mut report = IngestReport::empty(batch_id.clone());

        if self.concurrent {
            let runs = join_all(
                descriptors
                    .iter()
                    .map(|descriptor| self.process_one(descriptor, &batch_id)),
            )
            .await;
            for (descriptor, result) in descriptors.iter().zip(runs) {
                let (read, run) = result?;
                report.absorb(descriptor, read, run);
            }
        } else {
            for descriptor in descriptors {
                let (read, run) = self.process_one(descriptor, &batch_id).await?;
                report.absorb(descriptor, read, run);
            }
        }

        if report.all_sources_failed() {
            self.observer.error(&IngestEvent::AllSourcesFailed {
                failed: report.sources.len(),
            });
        }

        info!(
            batch_id = %report.batch_id,
            scored = report.records.len(),
            failed_sources = report.failed_sources().len(),
            skipped_records = report.record_failures.iter().filter(|f| f.error.drops_record()).count(),
            "Ingest complete"
        );

        Ok(report)
    }

    async fn process_one(
        &self,
        descriptor: &SourceDescriptor,
        batch_id: &BatchId,
    ) -> Result<(SourceRead, PipelineRun), ConfigurationError> {
        let adapter = self.adapters.get(descriptor.kind())?;
        let mut read = adapter.read(descriptor).await;
        let rows = std::mem::take(&mut read.rows);
        let run = self.pipeline.run(descriptor, rows, batch_id).await;
        Ok((read, run))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use reviewsignal_common::{SentimentCategory, SourceKind};
    use SentimentCategory::*;

    fn coordinator(adapters: AdapterSet, observer: Arc<RecordingObserver>) -> MultiSourceCoordinator {
        let scorer = StubScorer::new()
            .on("great", 0.9)
            .on("fine", 0.2)
            .on("meh", 0.0)
            .on("bad", -0.3)
            .on("awful", -0.8);
        MultiSourceCoordinator::new(
            adapters,
            ReviewPipeline::new(Arc::new(scorer), observer.clone()),
            Arc::new(FixedBatchIds::new("batch_fixed")),
            observer,
        )
    }

    fn adapters(observer: Arc<RecordingObserver>) -> AdapterSet {
        AdapterSet::new()
            .with(Arc::new(
                StaticSource::new(SourceKind::Csv)
                    .with_observer(observer.clone())
                    .on("a.csv", review_rows(&["great", "fine"]))
                    .on("c.csv", review_rows(&["awful", "meh", "great"])),
            ))
            .with(Arc::new(
                StaticSource::new(SourceKind::Api)
                    .with_observer(observer.clone())
                    .failing("https://down.test/reviews", SourceError::Connection("refused".into())),
            ))
            .with(Arc::new(
                StaticSource::new(SourceKind::Json)
                    .with_observer(observer)
                    .on("b.json", review_rows(&["bad"])),
            ))
    }

    fn source_failures(observer: &RecordingObserver) -> Vec<SourceFailure> {
        observer
            .errors()
            .into_iter()
            .filter_map(|event| match event {
                IngestEvent::SourceFailed(failure) => Some(failure),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn middle_source_failure_leaves_others_intact() {
        let observer = Arc::new(RecordingObserver::new());
        let report = coordinator(adapters(observer.clone()), observer.clone())
            .process(&[
                SourceDescriptor::csv("a.csv"),
                SourceDescriptor::api("https://down.test/reviews", None),
                SourceDescriptor::csv("c.csv"),
            ])
            .await
            .unwrap();

        let expected: BatchSummary = [VeryPositive, Positive, VeryNegative, Neutral, VeryPositive]
            .into_iter()
            .collect();
        assert_eq!(report.summary, expected);
        assert_eq!(report.records.len(), 5);
        assert_eq!(report.failed_sources().len(), 1);
        assert_eq!(report.failed_sources()[0].source.kind(), SourceKind::Api);
        assert!(!report.all_sources_failed());
        assert!(report.ensure_any_source_read().is_ok());
        assert!(report.records.iter().all(|r| r.batch_id().as_str() == "batch_fixed"));

        let reported = source_failures(&observer);
        assert_eq!(reported.len(), 1);
        assert_eq!(
            reported[0].source,
            SourceDescriptor::api("https://down.test/reviews", None)
        );
        assert_eq!(reported[0].error, SourceError::Connection("refused".into()));
        assert!(!observer
            .errors()
            .iter()
            .any(|e| matches!(e, IngestEvent::AllSourcesFailed { .. })));
    }

    #[tokio::test]
    async fn summary_is_sum_of_per_source_summaries() {
        let observer = Arc::new(RecordingObserver::new());
        let report = coordinator(adapters(observer.clone()), observer)
            .process(&[
                SourceDescriptor::csv("a.csv"),
                SourceDescriptor::json("b.json"),
                SourceDescriptor::csv("c.csv"),
            ])
            .await
            .unwrap();

        let mut merged = BatchSummary::new();
        for outcome in &report.sources {
            merged.merge(&outcome.summary);
        }
        assert_eq!(report.summary, merged);
        assert_eq!(report.summary, summarize(&report.records));
        assert_eq!(report.summary.get(Negative), 1);
    }

    #[tokio::test]
    async fn all_sources_failing_yields_zero_summary_and_failure_set() {
        let observer = Arc::new(RecordingObserver::new());
        let report = coordinator(adapters(observer.clone()), observer.clone())
            .process(&[
                SourceDescriptor::api("https://down.test/reviews", None),
                SourceDescriptor::csv("missing.csv"),
            ])
            .await
            .unwrap();

        assert!(report.summary.is_empty());
        assert!(report.all_sources_failed());
        assert_eq!(report.failed_sources().len(), 2);
        assert!(observer
            .errors()
            .contains(&IngestEvent::AllSourcesFailed { failed: 2 }));
        assert_eq!(source_failures(&observer).len(), 2);
        assert!(matches!(
            report.ensure_any_source_read(),
            Err(IngestError::AllSourcesFailed { failed: 2 })
        ));
    }

    #[tokio::test]
    async fn unregistered_kind_is_rejected_before_reading_anything() {
        let csv_only = AdapterSet::new().with(Arc::new(
            StaticSource::new(SourceKind::Csv).on("a.csv", review_rows(&["great"])),
        ));
        let observer = Arc::new(RecordingObserver::new());
        let err = coordinator(csv_only, observer.clone())
            .process(&[
                SourceDescriptor::csv("a.csv"),
                SourceDescriptor::json("b.json"),
            ])
            .await
            .unwrap_err();

        assert_eq!(err, ConfigurationError::AdapterUnavailable("json".into()));
        assert!(observer.events().is_empty());
    }

    #[tokio::test]
    async fn concurrent_run_matches_sequential_run() {
        let descriptors = [
            SourceDescriptor::csv("c.csv"),
            SourceDescriptor::api("https://down.test/reviews", None),
            SourceDescriptor::json("b.json"),
            SourceDescriptor::csv("a.csv"),
        ];
        let seq_observer = Arc::new(RecordingObserver::new());
        let sequential = coordinator(adapters(seq_observer.clone()), seq_observer)
            .process(&descriptors)
            .await
            .unwrap();
        let con_observer = Arc::new(RecordingObserver::new());
        let concurrent = coordinator(adapters(con_observer.clone()), con_observer)
            .concurrent(true)
            .process(&descriptors)
            .await
            .unwrap();

        assert_eq!(sequential.summary, concurrent.summary);
        assert_eq!(sequential.sources, concurrent.sources);
        let texts = |r: &IngestReport| r.records.iter().map(|x| x.text().to_string()).collect::<Vec<_>>();
        assert_eq!(texts(&sequential), texts(&concurrent));
    }

    #[tokio::test]
    async fn empty_descriptor_list_is_all_zero_and_not_a_failure() {
        let observer = Arc::new(RecordingObserver::new());
        let report = coordinator(adapters(observer.clone()), observer)
            .process(&[])
            .await
            .unwrap();
        assert!(report.summary.is_empty());
        assert!(!report.all_sources_failed());
        assert!(report.ensure_any_source_read().is_ok());
    }

    #[tokio::test]
    async fn report_json_has_summary_sources_and_sample() {
        let observer = Arc::new(RecordingObserver::new());
        let report = coordinator(adapters(observer.clone()), observer)
            .process(&[
                SourceDescriptor::csv("c.csv"),
                SourceDescriptor::api("https://down.test/reviews", Some("token".into())),
            ])
            .await
            .unwrap();

        let json = report.to_json(2).unwrap();
        assert_eq!(json["batch_id"], "batch_fixed");
        assert_eq!(json["summary"]["very_positive"], 1);
        assert_eq!(json["sample_records"].as_array().unwrap().len(), 2);
        assert_eq!(json["sources"][1]["error"], "connection failed: refused");
        assert!(json["sources"][1]["source"].get("api_key").is_none());
        assert!(json["sources"][0]["error"].is_null());
    }
}
