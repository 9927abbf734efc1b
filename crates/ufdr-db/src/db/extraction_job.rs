use sqlx::{PgPool, Row};
use ufdr_core::models::{ExtractionJob, JobStatus};
use ufdr_core::AppError;
use uuid::Uuid;

/// Repository for per-domain extraction status rows.
///
/// One row per (upload, domain label). The six evidence-tree domains and
/// the embedded chat-database pass (`chat_messages`) each get their own
/// row; domains never touch each other's rows.
#[derive(Clone)]
pub struct ExtractionJobRepository {
    pool: PgPool,
}

impl ExtractionJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create (or reset to pending) the status row for one domain.
    pub async fn create(&self, upload_id: Uuid, domain: &str) -> Result<Uuid, AppError> {
        let row = sqlx::query(
            r#"
            INSERT INTO extraction_jobs (id, upload_id, domain, status)
            VALUES ($1, $2, $3, 'pending')
            ON CONFLICT (upload_id, domain) DO UPDATE
            SET status = 'pending', error_message = NULL, updated_at = NOW()
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(upload_id)
        .bind(domain)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("id")?)
    }

    pub async fn mark_processing(&self, upload_id: Uuid, domain: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE extraction_jobs
            SET status = 'processing', updated_at = NOW()
            WHERE upload_id = $1 AND domain = $2
            "#,
        )
        .bind(upload_id)
        .bind(domain)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Set once, when the domain's record count is known.
    pub async fn set_total(
        &self,
        upload_id: Uuid,
        domain: &str,
        total: i64,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE extraction_jobs
            SET total_count = $3, updated_at = NOW()
            WHERE upload_id = $1 AND domain = $2
            "#,
        )
        .bind(upload_id)
        .bind(domain)
        .bind(total)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Advance the processed counter after each loaded batch.
    pub async fn set_processed(
        &self,
        upload_id: Uuid,
        domain: &str,
        processed: i64,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE extraction_jobs
            SET processed_count = $3, updated_at = NOW()
            WHERE upload_id = $1 AND domain = $2
            "#,
        )
        .bind(upload_id)
        .bind(domain)
        .bind(processed)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn mark_completed(
        &self,
        upload_id: Uuid,
        domain: &str,
        total: i64,
        processed: i64,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE extraction_jobs
            SET status = 'completed', total_count = $3, processed_count = $4,
                updated_at = NOW()
            WHERE upload_id = $1 AND domain = $2
            "#,
        )
        .bind(upload_id)
        .bind(domain)
        .bind(total)
        .bind(processed)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn mark_failed(
        &self,
        upload_id: Uuid,
        domain: &str,
        error: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE extraction_jobs
            SET status = 'failed', error_message = $3, updated_at = NOW()
            WHERE upload_id = $1 AND domain = $2
            "#,
        )
        .bind(upload_id)
        .bind(domain)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn list_for_upload(&self, upload_id: Uuid) -> Result<Vec<ExtractionJob>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT id, upload_id, domain, status, total_count, processed_count,
                   error_message, created_at, updated_at
            FROM extraction_jobs
            WHERE upload_id = $1
            ORDER BY domain
            "#,
        )
        .bind(upload_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let status_str: String = row.try_get("status")?;
                let status = JobStatus::parse(&status_str).ok_or_else(|| {
                    AppError::Internal(format!("unknown job status {status_str}"))
                })?;
                Ok(ExtractionJob {
                    id: row.try_get("id")?,
                    upload_id: row.try_get("upload_id")?,
                    domain: row.try_get("domain")?,
                    status,
                    total_count: row.try_get("total_count")?,
                    processed_count: row.try_get("processed_count")?,
                    error_message: row.try_get("error_message")?,
                    created_at: row.try_get("created_at")?,
                    updated_at: row.try_get("updated_at")?,
                })
            })
            .collect()
    }
}
