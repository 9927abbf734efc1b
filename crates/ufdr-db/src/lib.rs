//! UFDR Database Library
//!
//! sqlx/Postgres repositories for upload sessions, per-domain extraction
//! jobs, the durable ingest task queue, and the batch loaders that
//! upsert extracted evidence. SQL migrations live in the workspace
//! `migrations/` directory and run at startup.

pub mod db;

pub use db::extraction_job::ExtractionJobRepository;
pub use db::loaders;
pub use db::tasks::{IngestTask, IngestTaskRepository, INGEST_NOTIFY_CHANNEL};
pub use db::upload_session::UploadSessionRepository;

/// Embedded migrator pointing at the workspace migrations directory.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");
