// HTTP API source. GETs `location`, optionally with a bearer token, and
// parses the body like a JSON file. Non-2xx, timeouts and connection errors
// fail the source.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reviewsignal_common::{preview, SourceDescriptor, SourceKind};

use super::{finish_read, records_from_json, RawRow, SourceAdapter, SourceRead};
use crate::error::SourceError;
use crate::observer::IngestObserver;

/// Longest error body kept in a `SourceError::Http`.
const MAX_ERROR_BODY_CHARS: usize = 300;

pub struct ApiSource {
    client: reqwest::Client,
    observer: Arc<dyn IngestObserver>,
}

impl ApiSource {
    pub fn new(observer: Arc<dyn IngestObserver>, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("reviewsignal/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, observer))
    }

    /// Use a preconfigured client. The caller owns its timeout.
    pub fn with_client(client: reqwest::Client, observer: Arc<dyn IngestObserver>) -> Self {
        Self { client, observer }
    }

    async fn fetch(&self, descriptor: &SourceDescriptor) -> Result<Vec<RawRow>, SourceError> {
        let mut request = self
            .client
            .get(descriptor.location())
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(token) = descriptor.credential() {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SourceError::Http {
                status: status.as_u16(),
                body: preview(&body, MAX_ERROR_BODY_CHARS),
            });
        }

        let bytes = resp.bytes().await?;
        let document = serde_json::from_slice(&bytes)?;
        records_from_json(document, descriptor)
    }
}

#[async_trait]
impl SourceAdapter for ApiSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Api
    }

    async fn read(&self, descriptor: &SourceDescriptor) -> SourceRead {
        finish_read(self.observer.as_ref(), descriptor, self.fetch(descriptor).await)
    }
}
