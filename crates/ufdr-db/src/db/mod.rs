pub mod extraction_job;
pub mod loaders;
pub mod tasks;
pub mod upload_session;
