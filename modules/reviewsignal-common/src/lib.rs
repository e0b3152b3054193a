pub mod batch_id;
pub mod categorize;
pub mod config;
pub mod error;
pub mod scoring;
pub mod summary;
pub mod types;

pub use batch_id::{BatchIdGenerator, ClockBatchIds};
pub use categorize::categorize;
pub use config::Config;
pub use error::{ConfigurationError, RecordError};
pub use scoring::{score_or_neutral, LexiconScorer, ScoreError, Sentiment, SentimentScorer};
pub use summary::{summarize, BatchSummary};
pub use types::*;
