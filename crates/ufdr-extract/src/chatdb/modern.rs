//! Modern message layout: normalized `message` rows joined through
//! `chat` and `jid`, with media split out into `message_media`.

use rusqlite::{Connection, OptionalExtension};
use ufdr_core::models::{ChatMessage, MediaDescriptor};
use ufdr_core::AppError;

use super::{db_err, table_exists};

const SELECT_MESSAGES: &str = "\
    SELECT m._id, m.chat_row_id, m.from_me, m.key_id, m.status, m.timestamp, \
           m.received_timestamp, m.message_type, m.text_data, m.starred, \
           chat_jid.raw_string, sender.raw_string \
    FROM message m \
    LEFT JOIN chat c ON m.chat_row_id = c._id \
    LEFT JOIN jid chat_jid ON c.jid_row_id = chat_jid._id \
    LEFT JOIN jid sender ON m.sender_jid_row_id = sender._id \
    WHERE m.chat_row_id > 0";

const SELECT_MEDIA: &str = "\
    SELECT file_path, mime_type, file_size, media_name, file_hash, \
           media_duration, message_url \
    FROM message_media WHERE message_row_id = ?1 AND chat_row_id = ?2";

struct RawMessage {
    row_id: i64,
    chat_row_id: i64,
    message: ChatMessage,
}

pub fn read_messages(conn: &Connection) -> Result<Vec<ChatMessage>, AppError> {
    let mut stmt = conn.prepare(SELECT_MESSAGES).map_err(db_err)?;
    let rows = stmt.query_map([], map_row).map_err(db_err)?;
    let raw = super::collect_rows(rows.filter_map(|row| match row {
        Ok(Some(raw)) => Some(Ok(raw)),
        Ok(None) => None,
        Err(e) => Some(Err(e)),
    }))?;

    let has_media = table_exists(conn, "message_media")?;
    let mut media_stmt = if has_media {
        Some(conn.prepare(SELECT_MEDIA).map_err(db_err)?)
    } else {
        None
    };

    let mut messages = Vec::with_capacity(raw.len());
    for item in raw {
        let mut message = item.message;
        if let Some(stmt) = media_stmt.as_mut() {
            message.media = lookup_media(stmt, item.row_id, item.chat_row_id)?;
        }
        messages.push(message);
    }
    Ok(messages)
}

fn map_row(row: &rusqlite::Row<'_>) -> Result<Option<RawMessage>, rusqlite::Error> {
    let row_id: i64 = row.get(0)?;
    let chat_row_id: i64 = row.get(1)?;
    // A message whose chat jid did not resolve has no thread to land in.
    let chat_jid: Option<String> = row.get(10)?;
    let Some(chat_jid) = chat_jid else {
        return Ok(None);
    };

    let from_me = row.get::<_, Option<i64>>(2)?.unwrap_or(0) != 0;
    let key_id: Option<String> = row.get(3)?;
    let sender_jid: Option<String> = if from_me { None } else { row.get(11)? };

    Ok(Some(RawMessage {
        row_id,
        chat_row_id,
        message: ChatMessage {
            msg_id: key_id.unwrap_or_else(|| row_id.to_string()),
            chat_jid,
            sender_jid,
            from_me,
            text: row.get(8)?,
            message_type: row.get(7)?,
            sent_ts_ms: row.get(5)?,
            received_ts_ms: row.get(6)?,
            delivery_status: row.get(4)?,
            starred: row.get::<_, Option<i64>>(9)?.unwrap_or(0) != 0,
            media: None,
            latitude: None,
            longitude: None,
            quoted_row_id: None,
            forwarded: false,
            mentioned_jids: Vec::new(),
        },
    }))
}

fn lookup_media(
    stmt: &mut rusqlite::Statement<'_>,
    message_row_id: i64,
    chat_row_id: i64,
) -> Result<Option<MediaDescriptor>, AppError> {
    let media = stmt
        .query_row([message_row_id, chat_row_id], |row| {
            Ok(MediaDescriptor {
                local_path: row.get(0)?,
                mime_type: row.get(1)?,
                size: row.get(2)?,
                name: row.get(3)?,
                hash: row.get(4)?,
                duration_seconds: row.get(5)?,
                url: row.get(6)?,
                caption: None,
            })
        })
        .optional()
        .map_err(db_err)?;

    Ok(media.filter(|m| !m.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modern_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_schema(&conn);
        conn
    }

    fn setup_schema(conn: &Connection) {
        conn.execute_batch(
            "CREATE TABLE jid (
                _id INTEGER PRIMARY KEY, user TEXT, server TEXT,
                raw_string TEXT, type INTEGER
            );
            CREATE TABLE chat (
                _id INTEGER PRIMARY KEY, jid_row_id INTEGER, subject TEXT,
                created_timestamp INTEGER, sort_timestamp INTEGER,
                archived INTEGER, hidden INTEGER, unseen_message_count INTEGER
            );
            CREATE TABLE message (
                _id INTEGER PRIMARY KEY, chat_row_id INTEGER, from_me INTEGER,
                key_id TEXT, sender_jid_row_id INTEGER, status INTEGER,
                timestamp INTEGER, received_timestamp INTEGER,
                message_type INTEGER, text_data TEXT, starred INTEGER
            );
            CREATE TABLE message_media (
                message_row_id INTEGER, chat_row_id INTEGER, file_path TEXT,
                mime_type TEXT, file_size INTEGER, media_name TEXT,
                file_hash TEXT, media_duration INTEGER, message_url TEXT
            );
            INSERT INTO jid (_id, user, server, raw_string) VALUES
              (1, '4912', 's.whatsapp.net', '4912@s.whatsapp.net'),
              (2, '4999', 's.whatsapp.net', '4999@s.whatsapp.net');
            INSERT INTO chat (_id, jid_row_id, subject) VALUES (10, 1, NULL);",
        )
        .unwrap();
    }

    #[test]
    fn messages_resolve_chat_and_sender_jids() {
        let conn = modern_conn();
        conn.execute(
            "INSERT INTO message
              (_id, chat_row_id, from_me, key_id, sender_jid_row_id, status,
               timestamp, received_timestamp, message_type, text_data, starred)
             VALUES (100, 10, 0, 'K1', 2, 13, 1698000000000, 1698000001000, 0,
                     'modern hello', 0)",
            [],
        )
        .unwrap();

        let messages = read_messages(&conn).unwrap();
        assert_eq!(messages.len(), 1);
        let msg = &messages[0];
        assert_eq!(msg.msg_id, "K1");
        assert_eq!(msg.chat_jid, "4912@s.whatsapp.net");
        assert_eq!(msg.sender_jid.as_deref(), Some("4999@s.whatsapp.net"));
        assert_eq!(msg.text.as_deref(), Some("modern hello"));
        assert!(msg.media.is_none());
    }

    #[test]
    fn media_joined_by_message_and_chat_row() {
        let conn = modern_conn();
        conn.execute_batch(
            "INSERT INTO message (_id, chat_row_id, from_me, key_id, message_type)
               VALUES (101, 10, 1, 'K2', 1);
             INSERT INTO message_media
               (message_row_id, chat_row_id, file_path, mime_type, file_size,
                media_name, file_hash, media_duration, message_url)
               VALUES (101, 10, 'Media/IMG_2.jpg', 'image/jpeg', 4096,
                       'IMG_2.jpg', 'cafebabe', 0, 'https://cdn/img2');",
        )
        .unwrap();

        let messages = read_messages(&conn).unwrap();
        let media = messages[0].media.as_ref().unwrap();
        assert_eq!(media.local_path.as_deref(), Some("Media/IMG_2.jpg"));
        assert_eq!(media.size, Some(4096));
        assert_eq!(media.url.as_deref(), Some("https://cdn/img2"));
    }

    #[test]
    fn unresolvable_chat_rows_skipped() {
        let conn = modern_conn();
        // chat_row_id 99 has no chat row, so the jid join yields NULL
        conn.execute(
            "INSERT INTO message (_id, chat_row_id, from_me, key_id) VALUES (102, 99, 0, 'K3')",
            [],
        )
        .unwrap();
        assert!(read_messages(&conn).unwrap().is_empty());
    }

    #[test]
    fn whole_db_reads_threads_alongside_messages() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("msgstore.db");
        let conn = Connection::open(&path).unwrap();
        setup_schema(&conn);
        conn.execute_batch(
            "UPDATE chat SET subject = 'family', archived = 1, unseen_message_count = 4;
             INSERT INTO message (_id, chat_row_id, from_me, key_id, text_data)
               VALUES (103, 10, 1, 'K4', 'hi');",
        )
        .unwrap();
        drop(conn);

        let records = super::super::read_chat_db(&path).unwrap();
        assert_eq!(records.messages.len(), 1);
        assert_eq!(records.threads.len(), 1);
        assert_eq!(records.threads[0].subject.as_deref(), Some("family"));
        assert!(records.threads[0].archived);
        assert_eq!(records.threads[0].unseen_count, Some(4));
    }
}
