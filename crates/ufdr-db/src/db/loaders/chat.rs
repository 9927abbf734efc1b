use sqlx::{PgPool, QueryBuilder};
use ufdr_core::models::{ChatCall, ChatContact, ChatMessage, ChatThread};
use ufdr_core::AppError;
use uuid::Uuid;

/// Batch loader for records recovered from embedded chat databases.
#[derive(Clone)]
pub struct ChatLoader {
    pool: PgPool,
}

impl ChatLoader {
    pub const MESSAGE_BATCH: usize = 100;

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn upsert_messages(
        &self,
        upload_id: Uuid,
        messages: &[ChatMessage],
    ) -> Result<(), AppError> {
        if messages.is_empty() {
            return Ok(());
        }

        let mut qb = QueryBuilder::new(
            r#"INSERT INTO chat_messages (
                upload_id, msg_id, chat_jid, sender_jid, from_me, text,
                message_type, sent_ts, received_ts, delivery_status, starred,
                media, latitude, longitude, quoted_row_id, forwarded,
                mentioned_jids
            ) "#,
        );
        qb.push_values(messages, |mut b, msg| {
            b.push_bind(upload_id)
                .push_bind(&msg.msg_id)
                .push_bind(&msg.chat_jid)
                .push_bind(&msg.sender_jid)
                .push_bind(msg.from_me)
                .push_bind(&msg.text)
                .push_bind(msg.message_type)
                .push_bind(msg.sent_ts_ms)
                .push_bind(msg.received_ts_ms)
                .push_bind(msg.delivery_status)
                .push_bind(msg.starred)
                .push_bind(super::to_json(&msg.media))
                .push_bind(msg.latitude)
                .push_bind(msg.longitude)
                .push_bind(msg.quoted_row_id)
                .push_bind(msg.forwarded)
                .push_bind(super::to_json(&msg.mentioned_jids));
        });
        qb.push(
            r#" ON CONFLICT (upload_id, msg_id, chat_jid) DO UPDATE SET
                sender_jid = COALESCE(EXCLUDED.sender_jid, chat_messages.sender_jid),
                text = COALESCE(EXCLUDED.text, chat_messages.text),
                message_type = COALESCE(EXCLUDED.message_type, chat_messages.message_type),
                sent_ts = COALESCE(EXCLUDED.sent_ts, chat_messages.sent_ts),
                received_ts = COALESCE(EXCLUDED.received_ts, chat_messages.received_ts),
                delivery_status = COALESCE(EXCLUDED.delivery_status, chat_messages.delivery_status),
                starred = EXCLUDED.starred,
                media = EXCLUDED.media,
                latitude = COALESCE(EXCLUDED.latitude, chat_messages.latitude),
                longitude = COALESCE(EXCLUDED.longitude, chat_messages.longitude),
                quoted_row_id = COALESCE(EXCLUDED.quoted_row_id, chat_messages.quoted_row_id),
                forwarded = EXCLUDED.forwarded,
                mentioned_jids = EXCLUDED.mentioned_jids,
                updated_at = NOW()"#,
        );

        qb.build().execute(&self.pool).await?;
        Ok(())
    }

    pub async fn upsert_threads(
        &self,
        upload_id: Uuid,
        threads: &[ChatThread],
    ) -> Result<(), AppError> {
        if threads.is_empty() {
            return Ok(());
        }

        let mut qb = QueryBuilder::new(
            r#"INSERT INTO chat_threads (
                upload_id, chat_jid, subject, created_ts, sort_ts,
                archived, hidden, unseen_count
            ) "#,
        );
        qb.push_values(threads, |mut b, thread| {
            b.push_bind(upload_id)
                .push_bind(&thread.chat_jid)
                .push_bind(&thread.subject)
                .push_bind(thread.created_ts_ms)
                .push_bind(thread.sort_ts_ms)
                .push_bind(thread.archived)
                .push_bind(thread.hidden)
                .push_bind(thread.unseen_count);
        });
        qb.push(
            r#" ON CONFLICT (upload_id, chat_jid) DO UPDATE SET
                subject = COALESCE(EXCLUDED.subject, chat_threads.subject),
                created_ts = COALESCE(EXCLUDED.created_ts, chat_threads.created_ts),
                sort_ts = COALESCE(EXCLUDED.sort_ts, chat_threads.sort_ts),
                archived = EXCLUDED.archived,
                hidden = EXCLUDED.hidden,
                unseen_count = COALESCE(EXCLUDED.unseen_count, chat_threads.unseen_count),
                updated_at = NOW()"#,
        );

        qb.build().execute(&self.pool).await?;
        Ok(())
    }

    pub async fn upsert_contacts(
        &self,
        upload_id: Uuid,
        contacts: &[ChatContact],
    ) -> Result<(), AppError> {
        if contacts.is_empty() {
            return Ok(());
        }

        let mut qb = QueryBuilder::new(
            r#"INSERT INTO chat_contacts (upload_id, jid, display_name, phone_number) "#,
        );
        qb.push_values(contacts, |mut b, contact| {
            b.push_bind(upload_id)
                .push_bind(&contact.jid)
                .push_bind(&contact.display_name)
                .push_bind(&contact.phone_number);
        });
        qb.push(
            r#" ON CONFLICT (upload_id, jid) DO UPDATE SET
                display_name = COALESCE(EXCLUDED.display_name, chat_contacts.display_name),
                phone_number = COALESCE(EXCLUDED.phone_number, chat_contacts.phone_number),
                updated_at = NOW()"#,
        );

        qb.build().execute(&self.pool).await?;
        Ok(())
    }

    pub async fn upsert_calls(
        &self,
        upload_id: Uuid,
        calls: &[ChatCall],
    ) -> Result<(), AppError> {
        if calls.is_empty() {
            return Ok(());
        }

        let mut qb = QueryBuilder::new(
            r#"INSERT INTO chat_calls (
                upload_id, call_id, jid, direction, call_kind,
                duration_seconds, status, bytes_transferred, is_group_call
            ) "#,
        );
        qb.push_values(calls, |mut b, call| {
            b.push_bind(upload_id)
                .push_bind(&call.call_id)
                .push_bind(&call.jid)
                .push_bind(&call.direction)
                .push_bind(&call.call_kind)
                .push_bind(call.duration_seconds)
                .push_bind(&call.status)
                .push_bind(call.bytes_transferred)
                .push_bind(call.is_group_call);
        });
        qb.push(
            r#" ON CONFLICT (upload_id, call_id) DO UPDATE SET
                jid = COALESCE(EXCLUDED.jid, chat_calls.jid),
                direction = EXCLUDED.direction,
                call_kind = EXCLUDED.call_kind,
                duration_seconds = COALESCE(EXCLUDED.duration_seconds, chat_calls.duration_seconds),
                status = EXCLUDED.status,
                bytes_transferred = COALESCE(EXCLUDED.bytes_transferred, chat_calls.bytes_transferred),
                is_group_call = EXCLUDED.is_group_call,
                updated_at = NOW()"#,
        );

        qb.build().execute(&self.pool).await?;
        Ok(())
    }
}
