//! Upload session handlers: init, complete, status, extraction-status.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use ufdr_core::models::{
    DomainProgress, ExtractionJob, ExtractionProgress, OverallStatus, UploadSession,
};
use ufdr_core::AppError;
use ufdr_storage::{plan_parts, CompletedPart};
use uuid::Uuid;

use crate::error::HttpAppError;
use crate::state::AppState;

const ARCHIVE_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Deserialize)]
pub struct InitUploadRequest {
    pub filename: String,
    pub size: i64,
    /// Optional client-requested part size in bytes.
    pub part_size: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PresignedPart {
    pub part_number: i32,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct InitUploadResponse {
    pub upload_id: Uuid,
    pub bucket: String,
    pub key: String,
    pub part_size: i64,
    pub total_parts: i32,
    pub parts: Vec<PresignedPart>,
}

/// Begin a resumable multipart upload: plan the part split, open the
/// store-side upload, and presign one PUT URL per part.
///
/// Capacity rejection happens before any store call. A presign failure
/// mid-loop aborts the store-side upload so no session row is left live.
#[tracing::instrument(skip(state, request), fields(filename = %request.filename, size = request.size))]
pub async fn init_upload(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InitUploadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    if request.filename.trim().is_empty() {
        return Err(AppError::InvalidInput("filename must not be empty".to_string()).into());
    }

    let plan = plan_parts(
        request.size,
        request.part_size,
        state.config.default_part_size,
        state.config.max_parts,
    )?;

    let upload_id = Uuid::new_v4();
    let key = UploadSession::storage_key(upload_id, &request.filename);
    let expires = Duration::from_secs(state.config.presign_expires_secs);

    let s3_upload_id = state
        .store
        .create_multipart(&key, ARCHIVE_CONTENT_TYPE)
        .await?;

    let mut parts = Vec::with_capacity(plan.total_parts as usize);
    for part_number in 1..=plan.total_parts {
        match state
            .store
            .presign_part(&key, &s3_upload_id, part_number, expires)
            .await
        {
            Ok(url) => parts.push(PresignedPart { part_number, url }),
            Err(e) => {
                abort_best_effort(&state, &key, &s3_upload_id).await;
                return Err(e.into());
            }
        }
    }

    if let Err(e) = state
        .sessions
        .create(
            upload_id,
            &request.filename,
            request.size,
            &state.config.s3_bucket,
            &key,
            &s3_upload_id,
            plan.part_size,
            plan.total_parts,
        )
        .await
    {
        abort_best_effort(&state, &key, &s3_upload_id).await;
        return Err(e.into());
    }

    tracing::info!(
        upload_id = %upload_id,
        total_parts = plan.total_parts,
        part_size = plan.part_size,
        "upload session initiated"
    );

    Ok(Json(InitUploadResponse {
        upload_id,
        bucket: state.config.s3_bucket.clone(),
        key,
        part_size: plan.part_size,
        total_parts: plan.total_parts,
        parts,
    }))
}

async fn abort_best_effort(state: &AppState, key: &str, s3_upload_id: &str) {
    if let Err(abort_err) = state.store.abort_multipart(key, s3_upload_id).await {
        tracing::error!(error = %abort_err, key = %key, "abort after failed init also failed");
    }
}

#[derive(Debug, Deserialize)]
pub struct CompletedPartRequest {
    pub part_number: i32,
    pub etag: String,
}

#[derive(Debug, Deserialize)]
pub struct CompleteUploadRequest {
    pub parts: Vec<CompletedPartRequest>,
}

#[derive(Debug, Serialize)]
pub struct CompleteUploadResponse {
    pub upload_id: Uuid,
    pub key: String,
    pub bucket: String,
    pub status: String,
    pub location: Option<String>,
    pub ingest_job_id: Option<Uuid>,
}

/// Finalize the multipart upload and enqueue extraction.
///
/// The store is authoritative: part-count or etag mismatches surface
/// from the finalize call. A failed enqueue is recorded on the session
/// but does not fail the response; the upload itself succeeded.
#[tracing::instrument(skip(state, request), fields(upload_id = %id, parts = request.parts.len()))]
pub async fn complete_upload(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<CompleteUploadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let session = state
        .sessions
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("upload {id}")))?;

    if request.parts.is_empty() {
        return Err(AppError::InvalidInput("no parts supplied".to_string()).into());
    }

    let mut parts: Vec<CompletedPart> = request
        .parts
        .into_iter()
        .map(|p| CompletedPart {
            part_number: p.part_number,
            etag: p.etag,
        })
        .collect();
    parts.sort_by_key(|p| p.part_number);

    let completed = state
        .store
        .complete_multipart(&session.key, &session.s3_upload_id, &parts)
        .await?;

    state
        .sessions
        .mark_uploaded(id, completed.location.as_deref(), Utc::now())
        .await?;

    // Enqueue failure is non-fatal; the object is safely in the store
    // and the session can be re-queued.
    let (status, ingest_job_id) = match state
        .tasks
        .enqueue(id, &session.bucket, &session.key, &session.filename)
        .await
    {
        Ok(job_id) => {
            state.sessions.mark_queued(id, job_id).await?;
            ("queued_for_ingest", Some(job_id))
        }
        Err(e) => {
            tracing::warn!(error = %e, upload_id = %id, "ingest enqueue failed");
            state
                .sessions
                .record_enqueue_failure(id, &e.to_string())
                .await?;
            ("uploaded", None)
        }
    };

    tracing::info!(upload_id = %id, status, "upload completed");

    Ok(Json(CompleteUploadResponse {
        upload_id: id,
        key: session.key,
        bucket: session.bucket,
        status: status.to_string(),
        location: completed.location,
        ingest_job_id,
    }))
}

#[derive(Debug, Serialize)]
pub struct PartStatus {
    pub part_number: i32,
    pub size: i64,
}

#[derive(Debug, Serialize)]
pub struct UploadStatusResponse {
    pub upload_id: Uuid,
    pub key: String,
    pub bucket: String,
    pub status: String,
    pub part_size: i64,
    pub total_parts: i32,
    pub parts_uploaded: i32,
    /// Live store-side parts, only while the upload is in flight.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parts: Option<Vec<PartStatus>>,
}

/// Report upload progress. While the upload is in flight the store is
/// asked for its live part list (resume support); once finalized the
/// declared total is authoritative.
#[tracing::instrument(skip(state), fields(upload_id = %id))]
pub async fn upload_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let session = state
        .sessions
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("upload {id}")))?;

    let (parts_uploaded, parts) = if session.status.is_in_flight() {
        let live = state
            .store
            .list_parts(&session.key, &session.s3_upload_id)
            .await?;
        let parts = live
            .iter()
            .map(|p| PartStatus {
                part_number: p.part_number,
                size: p.size,
            })
            .collect::<Vec<_>>();
        (parts.len() as i32, Some(parts))
    } else {
        (session.total_parts, None)
    };

    Ok(Json(UploadStatusResponse {
        upload_id: id,
        key: session.key,
        bucket: session.bucket,
        status: session.status.as_str().to_string(),
        part_size: session.part_size,
        total_parts: session.total_parts,
        parts_uploaded,
        parts,
    }))
}

#[derive(Debug, Serialize)]
pub struct DomainExtraction {
    /// pending, completed, or failed.
    pub status: String,
    pub extracted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExtractionStatusResponse {
    pub upload_id: Uuid,
    /// Raw pipeline status as published.
    pub status: String,
    /// Derived overall status: pending, running, completed, failed.
    pub overall_status: String,
    pub message: String,
    pub extractions: BTreeMap<String, DomainExtraction>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, String>,
    /// Per-domain job rows with record counts, chat pass included.
    pub jobs: Vec<ExtractionJob>,
}

fn extraction_response(
    upload_id: Uuid,
    progress: ExtractionProgress,
    jobs: Vec<ExtractionJob>,
) -> ExtractionStatusResponse {
    let overall = progress.overall_status();
    let message = match overall {
        OverallStatus::Pending => "extraction has not started",
        OverallStatus::Running => "extraction in progress",
        OverallStatus::Completed => "extraction completed",
        OverallStatus::Failed => "extraction finished with errors",
    };

    let mut extractions = BTreeMap::new();
    let mut errors = BTreeMap::new();
    for (domain, DomainProgress { extracted, error }) in progress.domains {
        let status = if error.is_some() {
            "failed"
        } else if extracted {
            "completed"
        } else {
            "pending"
        };
        if let Some(e) = &error {
            errors.insert(domain.clone(), e.clone());
        }
        extractions.insert(
            domain,
            DomainExtraction {
                status: status.to_string(),
                extracted,
                error,
            },
        );
    }

    ExtractionStatusResponse {
        upload_id,
        status: progress.status,
        overall_status: overall.as_str().to_string(),
        message: message.to_string(),
        extractions,
        errors,
        jobs,
    }
}

/// Report extraction progress: fast store first, durable snapshot as
/// fallback; an upload the worker has not touched yet reads as pending.
#[tracing::instrument(skip(state), fields(upload_id = %id))]
pub async fn extraction_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    // 404 for unknown ids, pending for known-but-untouched ones.
    if state.sessions.get(id).await?.is_none() {
        return Err(AppError::NotFound(format!("upload {id}")).into());
    }

    let progress = state
        .progress
        .fetch(id)
        .await?
        .unwrap_or_else(|| ExtractionProgress::new("pending"));
    let jobs = state.jobs.list_for_upload(id).await?;

    Ok(Json(extraction_response(id, progress, jobs)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ufdr_core::models::Domain;

    #[test]
    fn status_response_carries_key_bucket_and_parts_uploaded() {
        let response = UploadStatusResponse {
            upload_id: Uuid::new_v4(),
            key: "uploads/abc/case.ufdr".to_string(),
            bucket: "ufdr-uploads".to_string(),
            status: "uploading".to_string(),
            part_size: 64 * 1024 * 1024,
            total_parts: 4,
            parts_uploaded: 2,
            parts: None,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["key"], "uploads/abc/case.ufdr");
        assert_eq!(json["bucket"], "ufdr-uploads");
        assert_eq!(json["parts_uploaded"], 2);
        assert!(json.get("uploaded_parts").is_none());
    }

    #[test]
    fn extraction_response_reports_per_domain_status_and_message() {
        let mut progress = ExtractionProgress::new("done");
        for domain in Domain::ALL {
            progress.mark_extracted(domain);
        }
        progress.record_error(Domain::Browsing, "loader unavailable");

        let response = extraction_response(Uuid::new_v4(), progress, Vec::new());
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["overall_status"], "failed");
        assert_eq!(json["message"], "extraction finished with errors");
        assert_eq!(json["extractions"]["call_logs"]["status"], "completed");
        assert!(json["extractions"]["call_logs"]["extracted"].as_bool().unwrap());
        assert_eq!(json["extractions"]["browsing"]["status"], "failed");
        assert_eq!(json["errors"]["browsing"], "loader unavailable");
    }

    #[test]
    fn untouched_upload_reads_as_pending_with_no_errors_key() {
        let response =
            extraction_response(Uuid::new_v4(), ExtractionProgress::new("pending"), Vec::new());
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["overall_status"], "pending");
        assert_eq!(json["message"], "extraction has not started");
        assert_eq!(json["extractions"]["apps"]["status"], "pending");
        assert!(json.get("errors").is_none());
    }
}
