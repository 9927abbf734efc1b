//! Application state shared across handlers.

use std::sync::Arc;

use ufdr_core::Config;
use ufdr_db::{ExtractionJobRepository, IngestTaskRepository, UploadSessionRepository};
use ufdr_storage::MultipartStore;
use ufdr_worker::ProgressPublisher;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn MultipartStore>,
    pub sessions: UploadSessionRepository,
    pub tasks: IngestTaskRepository,
    pub jobs: ExtractionJobRepository,
    pub progress: ProgressPublisher,
}
