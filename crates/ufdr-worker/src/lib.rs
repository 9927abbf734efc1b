//! Worker side of the ingest path: durable task queue, extraction
//! pipeline, and progress publishing.

pub mod pipeline;
pub mod progress;
pub mod queue;
pub mod telemetry;

pub use pipeline::IngestPipeline;
pub use progress::ProgressPublisher;
pub use queue::{IngestQueue, IngestQueueConfig};
