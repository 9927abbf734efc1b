//! S3/MinIO multipart store implementation.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart as S3CompletedPart};
use aws_sdk_s3::Client;

use crate::traits::{
    ByteStream, CompletedPart, CompletedUpload, MultipartStore, PartInfo, StorageError,
    StorageResult,
};

/// S3-compatible multipart store. Works against AWS S3 proper and against
/// MinIO or other S3-compatible endpoints via `endpoint_url`.
#[derive(Clone)]
pub struct S3MultipartStore {
    client: Client,
    bucket: String,
}

impl S3MultipartStore {
    /// Build a store from the ambient AWS environment plus explicit
    /// region/endpoint settings. MinIO needs path-style addressing.
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region));
        if let Some(ref endpoint) = endpoint_url {
            loader = loader.endpoint_url(endpoint.clone());
        }
        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if endpoint_url.is_some() {
            builder = builder.force_path_style(true);
        }
        let client = Client::from_conf(builder.build());

        Ok(S3MultipartStore { client, bucket })
    }

    fn presign_config(expires_in: Duration) -> StorageResult<PresigningConfig> {
        PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::ConfigError(e.to_string()))
    }
}

#[async_trait]
impl MultipartStore for S3MultipartStore {
    async fn create_multipart(&self, key: &str, content_type: &str) -> StorageResult<String> {
        let output = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, bucket = %self.bucket, key = %key, "create multipart upload failed");
                StorageError::CreateFailed(e.to_string())
            })?;

        output
            .upload_id()
            .map(str::to_string)
            .ok_or_else(|| StorageError::CreateFailed("store returned no upload id".to_string()))
    }

    async fn presign_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        expires_in: Duration,
    ) -> StorageResult<String> {
        let presigned = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .presigned(Self::presign_config(expires_in)?)
            .await
            .map_err(|e| StorageError::PresignFailed {
                part_number,
                message: e.to_string(),
            })?;

        Ok(presigned.uri().to_string())
    }

    async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> StorageResult<CompletedUpload> {
        let completed = CompletedMultipartUpload::builder()
            .set_parts(Some(
                parts
                    .iter()
                    .map(|p| {
                        S3CompletedPart::builder()
                            .part_number(p.part_number)
                            .e_tag(&p.etag)
                            .build()
                    })
                    .collect(),
            ))
            .build();

        let output = self
            .client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(completed)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, bucket = %self.bucket, key = %key, "complete multipart upload failed");
                StorageError::CompleteFailed(e.to_string())
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            parts = parts.len(),
            "multipart upload completed"
        );

        Ok(CompletedUpload {
            location: output.location().map(str::to_string),
            etag: output.e_tag().map(str::to_string),
        })
    }

    async fn abort_multipart(&self, key: &str, upload_id: &str) -> StorageResult<()> {
        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| StorageError::AbortFailed(e.to_string()))?;
        Ok(())
    }

    async fn list_parts(&self, key: &str, upload_id: &str) -> StorageResult<Vec<PartInfo>> {
        let mut parts = Vec::new();
        let mut marker: Option<i32> = None;
        loop {
            let mut req = self
                .client
                .list_parts()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(upload_id);
            if let Some(m) = marker {
                req = req.part_number_marker(m.to_string());
            }
            let output = req
                .send()
                .await
                .map_err(|e| StorageError::ListPartsFailed(e.to_string()))?;

            for p in output.parts() {
                parts.push(PartInfo {
                    part_number: p.part_number().unwrap_or_default(),
                    size: p.size().unwrap_or_default(),
                    etag: p.e_tag().map(str::to_string),
                });
            }

            if output.is_truncated().unwrap_or(false) {
                marker = output
                    .next_part_number_marker()
                    .and_then(|m| m.parse::<i32>().ok());
                if marker.is_none() {
                    break;
                }
            } else {
                break;
            }
        }
        Ok(parts)
    }

    async fn download_stream(&self, key: &str) -> StorageResult<ByteStream> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let msg = e.to_string();
                if msg.contains("NoSuchKey") {
                    StorageError::NotFound(key.to_string())
                } else {
                    StorageError::DownloadFailed(msg)
                }
            })?;

        let stream = futures::stream::unfold(output.body, |mut body| async move {
            match body.try_next().await {
                Ok(Some(bytes)) => Some((Ok(bytes), body)),
                Ok(None) => None,
                Err(e) => Some((Err(StorageError::DownloadFailed(e.to_string())), body)),
            }
        });
        Ok(Box::pin(stream))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::DeleteFailed(e.to_string()))?;
        Ok(())
    }
}
