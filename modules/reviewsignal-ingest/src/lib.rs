pub mod coordinator;
pub mod deps;
pub mod error;
pub mod observer;
pub mod pipeline;
pub mod sources;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use coordinator::{IngestReport, MultiSourceCoordinator, SourceOutcome};
pub use deps::IngestDeps;
pub use error::{
    IngestError, PersistenceError, PersistenceFailure, RecordFailure, Result, SourceError,
    SourceFailure,
};
pub use observer::{IngestEvent, IngestObserver, TracingObserver};
pub use pipeline::{PipelineRun, ReviewPipeline};
pub use sources::{AdapterSet, ApiSource, CsvSource, JsonFileSource, RawRow, SourceAdapter, SourceRead};
pub use store::{MemoryReviewStore, PgReviewStore, ReviewStore};
