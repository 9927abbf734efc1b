use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use ufdr_core::AppError;
use uuid::Uuid;

/// Channel name for PostgreSQL LISTEN/NOTIFY when an ingest task is enqueued.
pub const INGEST_NOTIFY_CHANNEL: &str = "ufdr_new_ingest_task";

/// One durable ingest task: process the object a completed upload left in
/// the store. At-least-once delivery; the extraction path is idempotent.
#[derive(Debug, Clone)]
pub struct IngestTask {
    pub id: Uuid,
    pub upload_id: Uuid,
    pub bucket: String,
    pub key: String,
    pub filename: String,
    pub status: String,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl IngestTask {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(IngestTask {
            id: row.try_get("id")?,
            upload_id: row.try_get("upload_id")?,
            bucket: row.try_get("bucket")?,
            key: row.try_get("key")?,
            filename: row.try_get("filename")?,
            status: row.try_get("status")?,
            error_message: row.try_get("error_message")?,
            created_at: row.try_get("created_at")?,
            started_at: row.try_get("started_at")?,
            finished_at: row.try_get("finished_at")?,
        })
    }
}

/// Repository for the durable ingest task queue.
#[derive(Clone)]
pub struct IngestTaskRepository {
    pool: PgPool,
}

impl IngestTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Enqueue one task and NOTIFY listeners so an idle worker wakes
    /// without waiting for its poll tick.
    pub async fn enqueue(
        &self,
        upload_id: Uuid,
        bucket: &str,
        key: &str,
        filename: &str,
    ) -> Result<Uuid, AppError> {
        let id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO ingest_tasks (id, upload_id, bucket, key, filename, status)
            VALUES ($1, $2, $3, $4, $5, 'pending')
            "#,
        )
        .bind(id)
        .bind(upload_id)
        .bind(bucket)
        .bind(key)
        .bind(filename)
        .execute(&mut *tx)
        .await?;

        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(INGEST_NOTIFY_CHANNEL)
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(id)
    }

    /// Claim the oldest pending task. `FOR UPDATE SKIP LOCKED` keeps
    /// concurrent workers from claiming the same row.
    pub async fn claim_next(&self) -> Result<Option<IngestTask>, AppError> {
        let row = sqlx::query(
            r#"
            UPDATE ingest_tasks
            SET status = 'running', started_at = NOW()
            WHERE id = (
                SELECT id FROM ingest_tasks
                WHERE status = 'pending'
                ORDER BY created_at
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            RETURNING id, upload_id, bucket, key, filename, status,
                      error_message, created_at, started_at, finished_at
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| IngestTask::from_row(&r).map_err(AppError::from))
            .transpose()
    }

    pub async fn mark_completed(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE ingest_tasks
            SET status = 'completed', finished_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn mark_failed(&self, id: Uuid, error: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE ingest_tasks
            SET status = 'failed', error_message = $2, finished_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fail tasks stuck in `running` past the timeout plus a grace period.
    /// Covers workers that died mid-task; the stuck-job policy lives here,
    /// not in the pipeline.
    pub async fn reap_stale_running(&self, older_than_secs: i64) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE ingest_tasks
            SET status = 'failed',
                error_message = 'reaped: worker did not finish in time',
                finished_at = NOW()
            WHERE status = 'running'
              AND started_at < NOW() - make_interval(secs => $1)
            "#,
        )
        .bind(older_than_secs as f64)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
