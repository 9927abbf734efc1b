//! In-memory multipart store for tests and local development.
//!
//! Tracks every call made to it and can be told to fail specific
//! operations, which lets tests assert things like "capacity rejection
//! happens before any store call" and "a presign failure aborts the
//! multipart upload it created".

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::traits::{
    ByteStream, CompletedPart, CompletedUpload, MultipartStore, PartInfo, StorageError,
    StorageResult,
};

#[derive(Default)]
struct PendingUpload {
    key: String,
    parts: HashMap<i32, Bytes>,
}

#[derive(Default)]
struct Inner {
    pending: HashMap<String, PendingUpload>,
    objects: HashMap<String, Bytes>,
    /// Part order as handed to the most recent `complete_multipart`.
    last_completed_order: Vec<i32>,
    next_upload_id: u64,
    /// Presigns after this many succeed will fail, when set.
    fail_presign_after: Option<u64>,
    fail_complete: bool,
}

/// Counters for every store operation, readable from tests.
#[derive(Default)]
pub struct CallCounts {
    pub create: AtomicU64,
    pub presign: AtomicU64,
    pub complete: AtomicU64,
    pub abort: AtomicU64,
    pub list_parts: AtomicU64,
    pub download: AtomicU64,
    pub delete: AtomicU64,
}

impl CallCounts {
    pub fn total(&self) -> u64 {
        self.create.load(Ordering::SeqCst)
            + self.presign.load(Ordering::SeqCst)
            + self.complete.load(Ordering::SeqCst)
            + self.abort.load(Ordering::SeqCst)
            + self.list_parts.load(Ordering::SeqCst)
            + self.download.load(Ordering::SeqCst)
            + self.delete.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
    pub calls: CallCounts,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make presign calls fail once `n` have succeeded.
    pub fn fail_presign_after(&self, n: u64) {
        self.inner.lock().unwrap().fail_presign_after = Some(n);
    }

    pub fn fail_complete(&self, fail: bool) {
        self.inner.lock().unwrap().fail_complete = fail;
    }

    /// Seed a finalized object directly, bypassing the multipart flow.
    pub fn put_object(&self, key: &str, data: impl Into<Bytes>) {
        self.inner
            .lock()
            .unwrap()
            .objects
            .insert(key.to_string(), data.into());
    }

    /// Simulate a client PUT to a presigned part URL.
    pub fn put_part(&self, upload_id: &str, part_number: i32, data: impl Into<Bytes>) -> String {
        let mut inner = self.inner.lock().unwrap();
        let pending = inner
            .pending
            .get_mut(upload_id)
            .expect("unknown upload id");
        pending.parts.insert(part_number, data.into());
        format!("\"etag-{part_number}\"")
    }

    pub fn pending_upload_count(&self) -> usize {
        self.inner.lock().unwrap().pending.len()
    }

    pub fn object_exists(&self, key: &str) -> bool {
        self.inner.lock().unwrap().objects.contains_key(key)
    }

    /// Part numbers in the order the last `complete_multipart` received them.
    pub fn last_completed_order(&self) -> Vec<i32> {
        self.inner.lock().unwrap().last_completed_order.clone()
    }
}

#[async_trait]
impl MultipartStore for InMemoryStore {
    async fn create_multipart(&self, key: &str, _content_type: &str) -> StorageResult<String> {
        self.calls.create.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.inner.lock().unwrap();
        inner.next_upload_id += 1;
        let upload_id = format!("mem-upload-{}", inner.next_upload_id);
        inner.pending.insert(
            upload_id.clone(),
            PendingUpload {
                key: key.to_string(),
                parts: HashMap::new(),
            },
        );
        Ok(upload_id)
    }

    async fn presign_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        _expires_in: Duration,
    ) -> StorageResult<String> {
        let count = self.calls.presign.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.lock().unwrap();
        if let Some(limit) = inner.fail_presign_after {
            if count >= limit {
                return Err(StorageError::PresignFailed {
                    part_number,
                    message: "injected presign failure".to_string(),
                });
            }
        }
        if !inner.pending.contains_key(upload_id) {
            return Err(StorageError::NotFound(upload_id.to_string()));
        }
        Ok(format!(
            "memory://{key}?uploadId={upload_id}&partNumber={part_number}"
        ))
    }

    async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> StorageResult<CompletedUpload> {
        self.calls.complete.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.inner.lock().unwrap();
        inner.last_completed_order = parts.iter().map(|p| p.part_number).collect();
        if inner.fail_complete {
            return Err(StorageError::CompleteFailed(
                "injected complete failure".to_string(),
            ));
        }
        // The store is authoritative on ordering, like S3.
        if parts.windows(2).any(|w| w[0].part_number >= w[1].part_number) {
            return Err(StorageError::CompleteFailed(
                "parts not in ascending order".to_string(),
            ));
        }
        let pending = inner
            .pending
            .remove(upload_id)
            .ok_or_else(|| StorageError::NotFound(upload_id.to_string()))?;
        let mut data = Vec::new();
        for p in parts {
            match pending.parts.get(&p.part_number) {
                Some(bytes) => data.extend_from_slice(bytes),
                None => {
                    let missing = p.part_number;
                    inner.pending.insert(upload_id.to_string(), pending);
                    return Err(StorageError::CompleteFailed(format!(
                        "part {missing} was never uploaded"
                    )));
                }
            }
        }
        inner.objects.insert(key.to_string(), Bytes::from(data));
        Ok(CompletedUpload {
            location: Some(format!("memory://{key}")),
            etag: Some("\"mem-etag\"".to_string()),
        })
    }

    async fn abort_multipart(&self, _key: &str, upload_id: &str) -> StorageResult<()> {
        self.calls.abort.fetch_add(1, Ordering::SeqCst);
        self.inner.lock().unwrap().pending.remove(upload_id);
        Ok(())
    }

    async fn list_parts(&self, _key: &str, upload_id: &str) -> StorageResult<Vec<PartInfo>> {
        self.calls.list_parts.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.lock().unwrap();
        let pending = inner
            .pending
            .get(upload_id)
            .ok_or_else(|| StorageError::NotFound(upload_id.to_string()))?;
        let mut parts: Vec<PartInfo> = pending
            .parts
            .iter()
            .map(|(n, bytes)| PartInfo {
                part_number: *n,
                size: bytes.len() as i64,
                etag: Some(format!("\"etag-{n}\"")),
            })
            .collect();
        parts.sort_by_key(|p| p.part_number);
        Ok(parts)
    }

    async fn download_stream(&self, key: &str) -> StorageResult<ByteStream> {
        self.calls.download.fetch_add(1, Ordering::SeqCst);
        let data = self
            .inner
            .lock()
            .unwrap()
            .objects
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        // 1 MiB chunks, mirroring the real backend's streaming behavior.
        let chunks: Vec<StorageResult<Bytes>> = data
            .chunks(1024 * 1024)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.calls.delete.fetch_add(1, Ordering::SeqCst);
        self.inner.lock().unwrap().objects.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn multipart_flow_assembles_object() {
        let store = InMemoryStore::new();
        let upload_id = store.create_multipart("uploads/x/a.zip", "application/zip").await.unwrap();
        store
            .presign_part("uploads/x/a.zip", &upload_id, 1, Duration::from_secs(60))
            .await
            .unwrap();
        let etag1 = store.put_part(&upload_id, 1, &b"hello "[..]);
        let etag2 = store.put_part(&upload_id, 2, &b"world"[..]);
        let parts = vec![
            CompletedPart { part_number: 1, etag: etag1 },
            CompletedPart { part_number: 2, etag: etag2 },
        ];
        store
            .complete_multipart("uploads/x/a.zip", &upload_id, &parts)
            .await
            .unwrap();
        assert!(store.object_exists("uploads/x/a.zip"));
        assert_eq!(store.pending_upload_count(), 0);

        let mut stream = store.download_stream("uploads/x/a.zip").await.unwrap();
        let mut data = Vec::new();
        while let Some(chunk) = stream.next().await {
            data.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(data, b"hello world");
    }

    #[tokio::test]
    async fn unordered_parts_are_rejected() {
        let store = InMemoryStore::new();
        let upload_id = store.create_multipart("k", "application/zip").await.unwrap();
        store.put_part(&upload_id, 1, &b"a"[..]);
        store.put_part(&upload_id, 2, &b"b"[..]);
        let parts = vec![
            CompletedPart { part_number: 2, etag: "\"etag-2\"".into() },
            CompletedPart { part_number: 1, etag: "\"etag-1\"".into() },
        ];
        let err = store.complete_multipart("k", &upload_id, &parts).await;
        assert!(matches!(err, Err(StorageError::CompleteFailed(_))));
    }

    #[tokio::test]
    async fn abort_discards_pending_parts() {
        let store = InMemoryStore::new();
        let upload_id = store.create_multipart("k", "application/zip").await.unwrap();
        store.put_part(&upload_id, 1, &b"a"[..]);
        store.abort_multipart("k", &upload_id).await.unwrap();
        assert_eq!(store.pending_upload_count(), 0);
        assert!(!store.object_exists("k"));
    }

    #[tokio::test]
    async fn presign_failure_injection_triggers_after_threshold() {
        let store = InMemoryStore::new();
        let upload_id = store.create_multipart("k", "application/zip").await.unwrap();
        store.fail_presign_after(2);
        assert!(store.presign_part("k", &upload_id, 1, Duration::from_secs(1)).await.is_ok());
        assert!(store.presign_part("k", &upload_id, 2, Duration::from_secs(1)).await.is_ok());
        assert!(store.presign_part("k", &upload_id, 3, Duration::from_secs(1)).await.is_err());
    }
}
