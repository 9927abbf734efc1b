use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of an upload session.
///
/// `Failed` is absorbing; every other transition moves forward:
/// initiated -> uploading -> uploaded -> queued_for_ingest -> processing -> done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Initiated,
    Uploading,
    Uploaded,
    QueuedForIngest,
    Processing,
    Done,
    Failed,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Initiated => "initiated",
            UploadStatus::Uploading => "uploading",
            UploadStatus::Uploaded => "uploaded",
            UploadStatus::QueuedForIngest => "queued_for_ingest",
            UploadStatus::Processing => "processing",
            UploadStatus::Done => "done",
            UploadStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "initiated" => UploadStatus::Initiated,
            "uploading" => UploadStatus::Uploading,
            "uploaded" => UploadStatus::Uploaded,
            "queued_for_ingest" => UploadStatus::QueuedForIngest,
            "processing" => UploadStatus::Processing,
            "done" => UploadStatus::Done,
            "failed" => UploadStatus::Failed,
            _ => return None,
        })
    }

    /// Whether the object is still being assembled at the store, meaning a
    /// status request should list live parts instead of the declared total.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, UploadStatus::Initiated | UploadStatus::Uploading)
    }
}

/// One multipart upload session. Durable in Postgres; never deleted.
///
/// `id` is server-generated and independent of the storage key, which is
/// namespaced as `uploads/{id}/{filename}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSession {
    pub id: Uuid,
    pub filename: String,
    pub size: i64,
    pub bucket: String,
    pub key: String,
    /// Store-side multipart upload id, needed for part listing and abort.
    pub s3_upload_id: String,
    pub part_size: i64,
    pub total_parts: i32,
    pub status: UploadStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Final object location returned by the store on completion.
    pub location: Option<String>,
    pub ingest_job_id: Option<Uuid>,
    pub ingest_status: Option<String>,
    pub ingest_error: Option<String>,
}

impl UploadSession {
    pub fn storage_key(id: Uuid, filename: &str) -> String {
        format!("uploads/{id}/{filename}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for s in [
            UploadStatus::Initiated,
            UploadStatus::Uploading,
            UploadStatus::Uploaded,
            UploadStatus::QueuedForIngest,
            UploadStatus::Processing,
            UploadStatus::Done,
            UploadStatus::Failed,
        ] {
            assert_eq!(UploadStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(UploadStatus::parse("bogus"), None);
    }

    #[test]
    fn only_pre_completion_statuses_are_in_flight() {
        assert!(UploadStatus::Initiated.is_in_flight());
        assert!(UploadStatus::Uploading.is_in_flight());
        assert!(!UploadStatus::Uploaded.is_in_flight());
        assert!(!UploadStatus::Done.is_in_flight());
    }

    #[test]
    fn storage_key_is_namespaced_by_session() {
        let id = Uuid::nil();
        assert_eq!(
            UploadSession::storage_key(id, "evidence.ufdr"),
            format!("uploads/{id}/evidence.ufdr")
        );
    }
}
