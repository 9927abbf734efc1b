use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use ufdr_core::models::{UploadSession, UploadStatus};
use ufdr_core::AppError;
use uuid::Uuid;

/// Repository for multipart upload sessions.
#[derive(Clone)]
pub struct UploadSessionRepository {
    pool: PgPool,
}

impl UploadSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persist a freshly initiated session.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        id: Uuid,
        filename: &str,
        size: i64,
        bucket: &str,
        key: &str,
        s3_upload_id: &str,
        part_size: i64,
        total_parts: i32,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO upload_sessions (
                id, filename, size, bucket, key, s3_upload_id,
                part_size, total_parts, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'initiated')
            "#,
        )
        .bind(id)
        .bind(filename)
        .bind(size)
        .bind(bucket)
        .bind(key)
        .bind(s3_upload_id)
        .bind(part_size)
        .bind(total_parts)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<UploadSession>, AppError> {
        let row = sqlx::query(
            r#"
            SELECT id, filename, size, bucket, key, s3_upload_id,
                   part_size, total_parts, status, created_at, completed_at,
                   location, ingest_job_id, ingest_status, ingest_error
            FROM upload_sessions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::map_row).transpose()
    }

    pub async fn set_status(&self, id: Uuid, status: UploadStatus) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE upload_sessions
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Record store-side completion: final location and timestamp.
    pub async fn mark_uploaded(
        &self,
        id: Uuid,
        location: Option<&str>,
        completed_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE upload_sessions
            SET status = 'uploaded', location = $2, completed_at = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(location)
        .bind(completed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn mark_queued(&self, id: Uuid, job_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE upload_sessions
            SET status = 'queued_for_ingest', ingest_job_id = $2,
                ingest_status = 'queued', updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// A failed enqueue is not fatal to the upload itself; record it so the
    /// session can be re-queued by hand.
    pub async fn record_enqueue_failure(&self, id: Uuid, error: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE upload_sessions
            SET ingest_status = 'enqueue_failed', ingest_error = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn set_ingest_status(
        &self,
        id: Uuid,
        status: UploadStatus,
        ingest_status: &str,
        ingest_error: Option<&str>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE upload_sessions
            SET status = $2, ingest_status = $3, ingest_error = $4, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(ingest_status)
        .bind(ingest_error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Durable mirror of the published progress snapshot.
    pub async fn save_progress_snapshot(
        &self,
        id: Uuid,
        snapshot: &serde_json::Value,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE upload_sessions
            SET progress_snapshot = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(snapshot)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_progress_snapshot(
        &self,
        id: Uuid,
    ) -> Result<Option<serde_json::Value>, AppError> {
        let row = sqlx::query(
            r#"
            SELECT progress_snapshot FROM upload_sessions WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            None => Err(AppError::NotFound(format!("upload {id}"))),
            Some(row) => Ok(row.try_get("progress_snapshot")?),
        }
    }

    fn map_row(row: sqlx::postgres::PgRow) -> Result<UploadSession, AppError> {
        let status_str: String = row.try_get("status")?;
        let status = UploadStatus::parse(&status_str)
            .ok_or_else(|| AppError::Internal(format!("unknown upload status {status_str}")))?;
        Ok(UploadSession {
            id: row.try_get("id")?,
            filename: row.try_get("filename")?,
            size: row.try_get("size")?,
            bucket: row.try_get("bucket")?,
            key: row.try_get("key")?,
            s3_upload_id: row.try_get("s3_upload_id")?,
            part_size: row.try_get("part_size")?,
            total_parts: row.try_get("total_parts")?,
            status,
            created_at: row.try_get("created_at")?,
            completed_at: row.try_get("completed_at")?,
            location: row.try_get("location")?,
            ingest_job_id: row.try_get("ingest_job_id")?,
            ingest_status: row.try_get("ingest_status")?,
            ingest_error: row.try_get("ingest_error")?,
        })
    }
}
