//! Progress publishing: a fast-store hash for live polling plus a
//! durable snapshot on the upload row.
//!
//! Publishing is best effort. A dead fast store degrades status reads
//! to the snapshot; it never fails an extraction.

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use ufdr_core::models::ExtractionProgress;
use ufdr_core::AppError;
use ufdr_db::UploadSessionRepository;
use uuid::Uuid;

/// Hash entries expire after this; finished uploads are served from the
/// durable snapshot long after the fast store forgets them.
pub const PROGRESS_TTL_SECS: i64 = 6 * 3600;

fn progress_key(upload_id: Uuid) -> String {
    format!("ingest_progress:{upload_id}")
}

#[derive(Clone)]
pub struct ProgressPublisher {
    redis: Option<ConnectionManager>,
    sessions: UploadSessionRepository,
}

impl ProgressPublisher {
    /// Connect to the fast store. Connection failure is logged and the
    /// publisher runs snapshot-only.
    pub async fn connect(redis_url: &str, sessions: UploadSessionRepository) -> Self {
        let redis = match redis::Client::open(redis_url) {
            Ok(client) => match client.get_connection_manager().await {
                Ok(manager) => Some(manager),
                Err(e) => {
                    tracing::warn!(error = %e, "fast store unavailable, progress is snapshot-only");
                    None
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "bad fast store url, progress is snapshot-only");
                None
            }
        };
        Self { redis, sessions }
    }

    pub fn snapshot_only(sessions: UploadSessionRepository) -> Self {
        Self {
            redis: None,
            sessions,
        }
    }

    /// Publish the current progress. The durable snapshot is written
    /// first; the fast-store hash write is best effort on top.
    pub async fn publish(&self, upload_id: Uuid, progress: &ExtractionProgress) {
        let snapshot = match serde_json::to_value(progress) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(error = %e, upload_id = %upload_id, "progress not serializable");
                return;
            }
        };
        if let Err(e) = self
            .sessions
            .save_progress_snapshot(upload_id, &snapshot)
            .await
        {
            tracing::warn!(error = %e, upload_id = %upload_id, "progress snapshot write failed");
        }

        if let Some(manager) = &self.redis {
            let mut conn = manager.clone();
            let key = progress_key(upload_id);
            let mut fields: Vec<(String, String)> =
                vec![("status".to_string(), progress.status.clone())];
            for (label, domain) in &progress.domains {
                fields.push((
                    format!("{label}_extracted"),
                    domain.extracted.to_string(),
                ));
                if let Some(error) = &domain.error {
                    fields.push((format!("{label}_error"), error.clone()));
                }
            }

            let result: redis::RedisResult<()> = redis::pipe()
                .hset_multiple(&key, &fields)
                .ignore()
                .expire(&key, PROGRESS_TTL_SECS)
                .ignore()
                .query_async(&mut conn)
                .await;
            if let Err(e) = result {
                tracing::warn!(error = %e, upload_id = %upload_id, "fast store publish failed");
            }
        }
    }

    /// Read progress: fast store first, durable snapshot as fallback.
    /// `NotFound` only when the upload row itself does not exist.
    pub async fn fetch(&self, upload_id: Uuid) -> Result<Option<ExtractionProgress>, AppError> {
        if let Some(manager) = &self.redis {
            let mut conn = manager.clone();
            let key = progress_key(upload_id);
            match conn
                .hgetall::<_, std::collections::HashMap<String, String>>(&key)
                .await
            {
                Ok(fields) if !fields.is_empty() => {
                    return Ok(Some(progress_from_fields(fields)));
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, upload_id = %upload_id, "fast store read failed");
                }
            }
        }

        let snapshot = self.sessions.get_progress_snapshot(upload_id).await?;
        Ok(snapshot.and_then(|value| serde_json::from_value(value).ok()))
    }
}

fn progress_from_fields(
    mut fields: std::collections::HashMap<String, String>,
) -> ExtractionProgress {
    let status = fields.remove("status").unwrap_or_else(|| "pending".into());
    let mut progress = ExtractionProgress::new(&status);
    for (field, value) in fields {
        if let Some(label) = field.strip_suffix("_extracted") {
            progress
                .domains
                .entry(label.to_string())
                .or_default()
                .extracted = value == "true";
        } else if let Some(label) = field.strip_suffix("_error") {
            progress.domains.entry(label.to_string()).or_default().error = Some(value);
        }
    }
    progress
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use ufdr_core::models::{Domain, OverallStatus};

    #[test]
    fn hash_fields_round_trip_to_progress() {
        let mut source = ExtractionProgress::new("running");
        source.mark_extracted(Domain::Apps);
        source.record_error(Domain::Browsing, "loader down");

        let mut fields = HashMap::new();
        fields.insert("status".to_string(), source.status.clone());
        for (label, domain) in &source.domains {
            fields.insert(format!("{label}_extracted"), domain.extracted.to_string());
            if let Some(error) = &domain.error {
                fields.insert(format!("{label}_error"), error.clone());
            }
        }

        let restored = progress_from_fields(fields);
        assert_eq!(restored.status, "running");
        assert!(restored.domains["apps"].extracted);
        assert_eq!(
            restored.domains["browsing"].error.as_deref(),
            Some("loader down")
        );
        assert_eq!(restored.overall_status(), OverallStatus::Failed);
    }

    #[test]
    fn missing_status_field_defaults_to_pending() {
        let restored = progress_from_fields(HashMap::new());
        assert_eq!(restored.status, "pending");
        assert_eq!(restored.overall_status(), OverallStatus::Pending);
    }
}
