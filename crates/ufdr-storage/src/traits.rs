//! Multipart storage abstraction trait
//!
//! All object-store backends (S3/MinIO, in-memory) implement this trait
//! so the API handlers and the worker stager never couple to a backend.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Create multipart upload failed: {0}")]
    CreateFailed(String),

    #[error("Presign failed for part {part_number}: {message}")]
    PresignFailed { part_number: i32, message: String },

    #[error("Complete multipart upload failed: {0}")]
    CompleteFailed(String),

    #[error("Abort multipart upload failed: {0}")]
    AbortFailed(String),

    #[error("List parts failed: {0}")]
    ListPartsFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A part the client reports back after PUTting to its presigned URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPart {
    pub part_number: i32,
    pub etag: String,
}

/// What the store returns once a multipart upload is finalized.
#[derive(Debug, Clone)]
pub struct CompletedUpload {
    pub location: Option<String>,
    pub etag: Option<String>,
}

/// A live part of an in-progress multipart upload.
#[derive(Debug, Clone)]
pub struct PartInfo {
    pub part_number: i32,
    pub size: i64,
    pub etag: Option<String>,
}

/// Byte stream returned by `download_stream`.
pub type ByteStream = Pin<Box<dyn Stream<Item = StorageResult<Bytes>> + Send>>;

/// Multipart object-store abstraction.
///
/// The store is authoritative: `complete_multipart` is where part-count
/// or etag mismatches surface, not at the session layer.
#[async_trait]
pub trait MultipartStore: Send + Sync {
    /// Begin a multipart upload for `key` and return the store's upload id.
    async fn create_multipart(&self, key: &str, content_type: &str) -> StorageResult<String>;

    /// Presign a PUT URL for one part of an in-progress multipart upload.
    async fn presign_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Finalize a multipart upload. Parts must be sorted by part number
    /// ascending before calling; the store rejects unordered lists.
    async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> StorageResult<CompletedUpload>;

    /// Abort a multipart upload, discarding any parts already received.
    async fn abort_multipart(&self, key: &str, upload_id: &str) -> StorageResult<()>;

    /// List the parts the store has received for an in-progress upload.
    async fn list_parts(&self, key: &str, upload_id: &str) -> StorageResult<Vec<PartInfo>>;

    /// Download a finalized object as a bounded-memory byte stream.
    async fn download_stream(&self, key: &str) -> StorageResult<ByteStream>;

    /// Delete a finalized object.
    async fn delete(&self, key: &str) -> StorageResult<()>;
}
