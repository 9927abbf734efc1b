use sqlx::{PgPool, QueryBuilder};
use ufdr_core::models::MessageRecord;
use ufdr_core::AppError;
use uuid::Uuid;

/// Batch loader for instant messages from the evidence tree.
#[derive(Clone)]
pub struct MessageLoader {
    pool: PgPool,
}

impl MessageLoader {
    pub const BATCH: usize = 50;

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn upsert_batch(
        &self,
        upload_id: Uuid,
        messages: &[MessageRecord],
    ) -> Result<(), AppError> {
        if messages.is_empty() {
            return Ok(());
        }

        let mut qb = QueryBuilder::new(
            r#"INSERT INTO message_records (
                upload_id, model_id, source_app, body, message_type, platform,
                message_ts, message_time, parties, attachments,
                has_attachments, attachment_count,
                from_identifier, from_name, to_identifier, to_name,
                deleted_state, decoding_confidence, raw
            ) "#,
        );
        qb.push_values(messages, |mut b, msg| {
            b.push_bind(upload_id)
                .push_bind(&msg.model_id)
                .push_bind(&msg.source_app)
                .push_bind(&msg.body)
                .push_bind(&msg.message_type)
                .push_bind(&msg.platform)
                .push_bind(msg.timestamp_ms)
                .push_bind(msg.timestamp)
                .push_bind(super::to_json(&msg.parties))
                .push_bind(super::to_json(&msg.attachments))
                .push_bind(msg.has_attachments())
                .push_bind(msg.attachment_count())
                .push_bind(&msg.from_identifier)
                .push_bind(&msg.from_name)
                .push_bind(&msg.to_identifier)
                .push_bind(&msg.to_name)
                .push_bind(&msg.deleted_state)
                .push_bind(&msg.decoding_confidence)
                .push_bind(&msg.raw);
        });
        qb.push(
            r#" ON CONFLICT (upload_id, model_id) DO UPDATE SET
                source_app = EXCLUDED.source_app,
                body = COALESCE(EXCLUDED.body, message_records.body),
                message_type = COALESCE(EXCLUDED.message_type, message_records.message_type),
                platform = COALESCE(EXCLUDED.platform, message_records.platform),
                message_ts = COALESCE(EXCLUDED.message_ts, message_records.message_ts),
                message_time = COALESCE(EXCLUDED.message_time, message_records.message_time),
                parties = EXCLUDED.parties,
                attachments = EXCLUDED.attachments,
                has_attachments = EXCLUDED.has_attachments,
                attachment_count = EXCLUDED.attachment_count,
                from_identifier = COALESCE(EXCLUDED.from_identifier, message_records.from_identifier),
                from_name = COALESCE(EXCLUDED.from_name, message_records.from_name),
                to_identifier = COALESCE(EXCLUDED.to_identifier, message_records.to_identifier),
                to_name = COALESCE(EXCLUDED.to_name, message_records.to_name),
                deleted_state = COALESCE(EXCLUDED.deleted_state, message_records.deleted_state),
                decoding_confidence = COALESCE(EXCLUDED.decoding_confidence, message_records.decoding_confidence),
                raw = EXCLUDED.raw,
                updated_at = NOW()"#,
        );

        qb.build().execute(&self.pool).await?;
        Ok(())
    }
}
