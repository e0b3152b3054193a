use std::sync::Arc;
use std::time::Duration;

use reviewsignal_common::{BatchIdGenerator, ClockBatchIds, Config, LexiconScorer, SentimentScorer};
use typed_builder::TypedBuilder;

use crate::coordinator::MultiSourceCoordinator;
use crate::error::Result;
use crate::observer::{IngestObserver, TracingObserver};
use crate::pipeline::ReviewPipeline;
use crate::sources::AdapterSet;
use crate::store::ReviewStore;

/// Shared dependency container for ingest runs. Collaborators left unset
/// fall back to the lexicon scorer, tracing observer, clock batch ids and
/// no persistence.
#[derive(Clone, TypedBuilder)]
pub struct IngestDeps {
    pub config: Config,
    #[builder(default, setter(strip_option))]
    pub scorer: Option<Arc<dyn SentimentScorer>>,
    #[builder(default, setter(strip_option))]
    pub observer: Option<Arc<dyn IngestObserver>>,
    #[builder(default, setter(strip_option))]
    pub batch_ids: Option<Arc<dyn BatchIdGenerator>>,
    #[builder(default, setter(strip_option))]
    pub store: Option<Arc<dyn ReviewStore>>,
}

impl IngestDeps {
    pub fn observer(&self) -> Arc<dyn IngestObserver> {
        match &self.observer {
            Some(observer) => observer.clone(),
            None => Arc::new(TracingObserver),
        }
    }

    pub fn scorer(&self) -> Arc<dyn SentimentScorer> {
        match &self.scorer {
            Some(scorer) => scorer.clone(),
            None => Arc::new(LexiconScorer::new()),
        }
    }

    pub fn build_pipeline(&self) -> ReviewPipeline {
        let pipeline = ReviewPipeline::new(self.scorer(), self.observer())
            .with_text_field(self.config.text_field.clone())
            .with_preview_chars(self.config.preview_chars);
        match &self.store {
            Some(store) => pipeline.with_store(store.clone()),
            None => pipeline,
        }
    }

    pub fn build_adapters(&self) -> Result<AdapterSet> {
        let timeout = Duration::from_secs(self.config.api_timeout_secs);
        let adapters = AdapterSet::standard(self.observer(), timeout)
            .map_err(|e| anyhow::anyhow!("failed to build API client: {e}"))?;
        Ok(adapters)
    }

    pub fn build_coordinator(&self) -> Result<MultiSourceCoordinator> {
        let batch_ids: Arc<dyn BatchIdGenerator> = match &self.batch_ids {
            Some(batch_ids) => batch_ids.clone(),
            None => Arc::new(ClockBatchIds::new()),
        };
        Ok(MultiSourceCoordinator::new(
            self.build_adapters()?,
            self.build_pipeline(),
            batch_ids,
            self.observer(),
        )
        .concurrent(self.config.concurrent_sources))
    }
}
