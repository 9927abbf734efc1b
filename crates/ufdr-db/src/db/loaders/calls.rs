use sqlx::{PgPool, QueryBuilder};
use ufdr_core::models::CallRecord;
use ufdr_core::AppError;
use uuid::Uuid;

/// Batch loader for call records from the evidence tree.
#[derive(Clone)]
pub struct CallLoader {
    pool: PgPool,
}

impl CallLoader {
    pub const BATCH: usize = 20;

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn upsert_batch(
        &self,
        upload_id: Uuid,
        calls: &[CallRecord],
    ) -> Result<(), AppError> {
        if calls.is_empty() {
            return Ok(());
        }

        let mut qb = QueryBuilder::new(
            r#"INSERT INTO call_records (
                upload_id, model_id, source_app, direction, call_type, status,
                call_ts, call_time, duration_raw, duration_seconds,
                country_code, network_code, account, is_video_call,
                parties, from_identifier, from_name, to_identifier, to_name,
                deleted_state, decoding_confidence, raw
            ) "#,
        );
        qb.push_values(calls, |mut b, call| {
            b.push_bind(upload_id)
                .push_bind(&call.model_id)
                .push_bind(&call.source_app)
                .push_bind(&call.direction)
                .push_bind(&call.call_type)
                .push_bind(&call.status)
                .push_bind(call.timestamp_ms)
                .push_bind(call.timestamp)
                .push_bind(&call.duration_raw)
                .push_bind(call.duration_seconds)
                .push_bind(&call.country_code)
                .push_bind(&call.network_code)
                .push_bind(&call.account)
                .push_bind(call.is_video_call)
                .push_bind(super::to_json(&call.parties))
                .push_bind(&call.from_identifier)
                .push_bind(&call.from_name)
                .push_bind(&call.to_identifier)
                .push_bind(&call.to_name)
                .push_bind(&call.deleted_state)
                .push_bind(&call.decoding_confidence)
                .push_bind(&call.raw);
        });
        qb.push(
            r#" ON CONFLICT (upload_id, model_id) DO UPDATE SET
                source_app = COALESCE(EXCLUDED.source_app, call_records.source_app),
                direction = COALESCE(EXCLUDED.direction, call_records.direction),
                call_type = COALESCE(EXCLUDED.call_type, call_records.call_type),
                status = COALESCE(EXCLUDED.status, call_records.status),
                call_ts = COALESCE(EXCLUDED.call_ts, call_records.call_ts),
                call_time = COALESCE(EXCLUDED.call_time, call_records.call_time),
                duration_raw = COALESCE(EXCLUDED.duration_raw, call_records.duration_raw),
                duration_seconds = COALESCE(EXCLUDED.duration_seconds, call_records.duration_seconds),
                country_code = COALESCE(EXCLUDED.country_code, call_records.country_code),
                network_code = COALESCE(EXCLUDED.network_code, call_records.network_code),
                account = COALESCE(EXCLUDED.account, call_records.account),
                is_video_call = COALESCE(EXCLUDED.is_video_call, call_records.is_video_call),
                parties = EXCLUDED.parties,
                from_identifier = COALESCE(EXCLUDED.from_identifier, call_records.from_identifier),
                from_name = COALESCE(EXCLUDED.from_name, call_records.from_name),
                to_identifier = COALESCE(EXCLUDED.to_identifier, call_records.to_identifier),
                to_name = COALESCE(EXCLUDED.to_name, call_records.to_name),
                deleted_state = COALESCE(EXCLUDED.deleted_state, call_records.deleted_state),
                decoding_confidence = COALESCE(EXCLUDED.decoding_confidence, call_records.decoding_confidence),
                raw = EXCLUDED.raw,
                updated_at = NOW()"#,
        );

        qb.build().execute(&self.pool).await?;
        Ok(())
    }
}
