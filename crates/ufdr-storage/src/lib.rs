//! UFDR Storage Library
//!
//! Object-store abstraction for the upload/ingest path. The central seam
//! is the `MultipartStore` trait: create a multipart upload, presign one
//! URL per part for direct client PUTs, finalize or abort, list live
//! parts, and stream objects back down for extraction.
//!
//! # Storage key format
//!
//! Keys are namespaced per upload session: `uploads/{upload_id}/{filename}`.
//! The upload id is server-generated, so clients cannot collide keys.

pub mod memory;
pub mod plan;
pub mod s3;
pub mod traits;

pub use memory::InMemoryStore;
pub use plan::{plan_parts, PartPlan};
pub use s3::S3MultipartStore;
pub use traits::{
    CompletedPart, CompletedUpload, MultipartStore, PartInfo, StorageError, StorageResult,
};
