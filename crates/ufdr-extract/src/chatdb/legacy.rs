//! Legacy message layout: one wide `messages` table keyed by remote
//! jid, media columns inline on the row.

use rusqlite::Connection;
use ufdr_core::models::{ChatMessage, MediaDescriptor};
use ufdr_core::AppError;

use super::db_err;

const SELECT_MESSAGES: &str = "\
    SELECT _id, key_remote_jid, key_from_me, key_id, status, data, timestamp, \
           media_url, media_mime_type, media_wa_type, media_size, media_name, \
           media_caption, media_hash, media_duration, latitude, longitude, \
           remote_resource, received_timestamp, send_timestamp, starred, \
           quoted_row_id, forwarded, mentioned_jids \
    FROM messages WHERE _id > 0";

pub fn read_messages(conn: &Connection) -> Result<Vec<ChatMessage>, AppError> {
    let mut stmt = conn.prepare(SELECT_MESSAGES).map_err(db_err)?;
    let rows = stmt.query_map([], map_row).map_err(db_err)?;
    super::collect_rows(rows.filter_map(flatten_optional))
}

fn flatten_optional(
    row: Result<Option<ChatMessage>, rusqlite::Error>,
) -> Option<Result<ChatMessage, rusqlite::Error>> {
    match row {
        Ok(Some(message)) => Some(Ok(message)),
        Ok(None) => None,
        Err(e) => Some(Err(e)),
    }
}

fn map_row(row: &rusqlite::Row<'_>) -> Result<Option<ChatMessage>, rusqlite::Error> {
    let row_id: i64 = row.get(0)?;
    // Rows without a remote jid cannot be attributed to a thread.
    let chat_jid: Option<String> = row.get(1)?;
    let Some(chat_jid) = chat_jid else {
        return Ok(None);
    };

    let from_me = row.get::<_, Option<i64>>(2)?.unwrap_or(0) != 0;
    let key_id: Option<String> = row.get(3)?;
    let msg_id = key_id.unwrap_or_else(|| row_id.to_string());

    let media = MediaDescriptor {
        url: row.get(7)?,
        mime_type: row.get(8)?,
        size: row.get(10)?,
        name: row.get(11)?,
        caption: row.get(12)?,
        hash: row.get(13)?,
        duration_seconds: row.get(14)?,
        local_path: None,
    };

    let sender_jid: Option<String> = if from_me { None } else { row.get(17)? };
    let mentioned: Option<String> = row.get(23)?;
    let mentioned_jids = mentioned
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(Some(ChatMessage {
        msg_id,
        chat_jid,
        sender_jid,
        from_me,
        text: row.get(5)?,
        message_type: row.get(9)?,
        sent_ts_ms: row.get::<_, Option<i64>>(19)?.or(row.get(6)?),
        received_ts_ms: row.get(18)?,
        delivery_status: row.get(4)?,
        starred: row.get::<_, Option<i64>>(20)?.unwrap_or(0) != 0,
        media: if media.is_empty() { None } else { Some(media) },
        latitude: row.get(15)?,
        longitude: row.get(16)?,
        quoted_row_id: row.get(21)?,
        forwarded: row.get::<_, Option<i64>>(22)?.unwrap_or(0) != 0,
        mentioned_jids,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE messages (
                _id INTEGER PRIMARY KEY, key_remote_jid TEXT, key_from_me INTEGER,
                key_id TEXT, status INTEGER, data TEXT, timestamp INTEGER,
                media_url TEXT, media_mime_type TEXT, media_wa_type INTEGER,
                media_size INTEGER, media_name TEXT, media_caption TEXT,
                media_hash TEXT, media_duration INTEGER, latitude REAL,
                longitude REAL, remote_resource TEXT, received_timestamp INTEGER,
                send_timestamp INTEGER, starred INTEGER, quoted_row_id INTEGER,
                forwarded INTEGER, mentioned_jids TEXT
            );",
        )
        .unwrap();
        conn
    }

    #[test]
    fn text_message_with_key_id() {
        let conn = legacy_conn();
        conn.execute(
            "INSERT INTO messages
              (key_remote_jid, key_from_me, key_id, status, data, timestamp,
               remote_resource, received_timestamp, starred)
             VALUES ('4912@s.whatsapp.net', 0, 'ABCD1234', 13, 'hello there',
                     1698000000000, '4999@s.whatsapp.net', 1698000001000, 1)",
            [],
        )
        .unwrap();

        let messages = read_messages(&conn).unwrap();
        assert_eq!(messages.len(), 1);
        let msg = &messages[0];
        assert_eq!(msg.msg_id, "ABCD1234");
        assert_eq!(msg.chat_jid, "4912@s.whatsapp.net");
        assert_eq!(msg.sender_jid.as_deref(), Some("4999@s.whatsapp.net"));
        assert!(!msg.from_me);
        assert_eq!(msg.text.as_deref(), Some("hello there"));
        assert_eq!(msg.sent_ts_ms, Some(1698000000000));
        assert_eq!(msg.received_ts_ms, Some(1698000001000));
        assert!(msg.starred);
        assert!(msg.media.is_none());
    }

    #[test]
    fn row_id_used_when_key_id_missing_and_sender_dropped_for_own_messages() {
        let conn = legacy_conn();
        conn.execute(
            "INSERT INTO messages (_id, key_remote_jid, key_from_me, data, remote_resource)
             VALUES (42, 'grp@g.us', 1, 'sent by me', 'should-be-ignored')",
            [],
        )
        .unwrap();

        let messages = read_messages(&conn).unwrap();
        assert_eq!(messages[0].msg_id, "42");
        assert!(messages[0].from_me);
        assert!(messages[0].sender_jid.is_none());
    }

    #[test]
    fn media_and_mentions_flattened() {
        let conn = legacy_conn();
        conn.execute(
            "INSERT INTO messages
              (key_remote_jid, key_from_me, key_id, media_url, media_mime_type,
               media_size, media_name, media_caption, media_hash, media_duration,
               latitude, longitude, mentioned_jids)
             VALUES ('4912@s.whatsapp.net', 0, 'M1', 'https://cdn/img', 'image/jpeg',
                     2048, 'IMG_1.jpg', 'beach', 'deadbeef', 0,
                     41.9, 12.5, '491@s.whatsapp.net, 492@s.whatsapp.net')",
            [],
        )
        .unwrap();

        let messages = read_messages(&conn).unwrap();
        let media = messages[0].media.as_ref().unwrap();
        assert_eq!(media.mime_type.as_deref(), Some("image/jpeg"));
        assert_eq!(media.size, Some(2048));
        assert_eq!(messages[0].latitude, Some(41.9));
        assert_eq!(
            messages[0].mentioned_jids,
            vec!["491@s.whatsapp.net", "492@s.whatsapp.net"]
        );
    }

    #[test]
    fn rows_without_remote_jid_skipped() {
        let conn = legacy_conn();
        conn.execute(
            "INSERT INTO messages (key_remote_jid, key_from_me, data) VALUES (NULL, 0, 'orphan')",
            [],
        )
        .unwrap();
        assert!(read_messages(&conn).unwrap().is_empty());
    }
}
