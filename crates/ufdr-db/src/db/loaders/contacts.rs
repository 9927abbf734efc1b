use sqlx::{PgPool, QueryBuilder};
use ufdr_core::models::ContactRecord;
use ufdr_core::AppError;
use uuid::Uuid;

/// Batch loader for contacts and their typed entries.
#[derive(Clone)]
pub struct ContactLoader {
    pool: PgPool,
}

impl ContactLoader {
    pub const BATCH: usize = 20;

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn upsert_batch(
        &self,
        upload_id: Uuid,
        contacts: &[ContactRecord],
    ) -> Result<(), AppError> {
        if contacts.is_empty() {
            return Ok(());
        }

        let mut qb = QueryBuilder::new(
            r#"INSERT INTO contact_records (
                upload_id, model_id, source_app, service_identifier, name,
                account, contact_type, contact_group, created_ms, created_time,
                notes, interaction_statuses, user_tags, entries,
                deleted_state, decoding_confidence, raw
            ) "#,
        );
        qb.push_values(contacts, |mut b, contact| {
            b.push_bind(upload_id)
                .push_bind(&contact.model_id)
                .push_bind(&contact.source_app)
                .push_bind(&contact.service_identifier)
                .push_bind(&contact.name)
                .push_bind(&contact.account)
                .push_bind(&contact.contact_type)
                .push_bind(&contact.group)
                .push_bind(contact.created_ms)
                .push_bind(contact.created_at)
                .push_bind(super::to_json(&contact.notes))
                .push_bind(super::to_json(&contact.interaction_statuses))
                .push_bind(super::to_json(&contact.user_tags))
                .push_bind(super::to_json(&contact.entries))
                .push_bind(&contact.deleted_state)
                .push_bind(&contact.decoding_confidence)
                .push_bind(&contact.raw);
        });
        qb.push(
            r#" ON CONFLICT (upload_id, model_id) DO UPDATE SET
                source_app = COALESCE(EXCLUDED.source_app, contact_records.source_app),
                service_identifier = COALESCE(EXCLUDED.service_identifier, contact_records.service_identifier),
                name = COALESCE(EXCLUDED.name, contact_records.name),
                account = COALESCE(EXCLUDED.account, contact_records.account),
                contact_type = COALESCE(EXCLUDED.contact_type, contact_records.contact_type),
                contact_group = COALESCE(EXCLUDED.contact_group, contact_records.contact_group),
                created_ms = COALESCE(EXCLUDED.created_ms, contact_records.created_ms),
                created_time = COALESCE(EXCLUDED.created_time, contact_records.created_time),
                notes = EXCLUDED.notes,
                interaction_statuses = EXCLUDED.interaction_statuses,
                user_tags = EXCLUDED.user_tags,
                entries = EXCLUDED.entries,
                deleted_state = COALESCE(EXCLUDED.deleted_state, contact_records.deleted_state),
                decoding_confidence = COALESCE(EXCLUDED.decoding_confidence, contact_records.decoding_confidence),
                raw = EXCLUDED.raw,
                updated_at = NOW()"#,
        );

        qb.build().execute(&self.pool).await?;
        Ok(())
    }
}
