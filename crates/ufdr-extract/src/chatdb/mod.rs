//! Embedded chat database parsing.
//!
//! Vendors ship two generations of the messaging schema: a legacy
//! single-table layout (a `messages` table keyed by remote jid) and a
//! modern normalized layout (`message` + `chat` + `jid` with media in
//! `message_media`). Both are probed via `sqlite_master` and read
//! through the matching module; the shared `chat`, `jid` and `call_log`
//! tables are read here when present.

mod legacy;
mod modern;

use std::path::Path;

use rusqlite::{Connection, OpenFlags, OptionalExtension};
use ufdr_core::models::{ChatCall, ChatContact, ChatMessage, ChatThread};
use ufdr_core::AppError;

/// Everything recovered from one database file.
#[derive(Debug, Default)]
pub struct ChatDbRecords {
    pub messages: Vec<ChatMessage>,
    pub threads: Vec<ChatThread>,
    pub contacts: Vec<ChatContact>,
    pub calls: Vec<ChatCall>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    Legacy,
    Modern,
}

/// Read one staged database file. The file is opened read-only; a file
/// that is not SQLite, or that carries neither message table, is a
/// format error for the caller to record against the chat pass.
pub fn read_chat_db(path: &Path) -> Result<ChatDbRecords, AppError> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| AppError::Format(format!("open chat db {}: {e}", path.display())))?;

    let schema = detect_schema(&conn)?.ok_or_else(|| {
        AppError::Format(format!(
            "no recognized message table in {}",
            path.display()
        ))
    })?;

    let mut records = ChatDbRecords::default();
    records.messages = match schema {
        SchemaKind::Legacy => legacy::read_messages(&conn)?,
        SchemaKind::Modern => modern::read_messages(&conn)?,
    };

    if table_exists(&conn, "chat")? && table_exists(&conn, "jid")? {
        records.threads = read_threads(&conn)?;
    }
    if table_exists(&conn, "jid")? {
        records.contacts = read_contacts(&conn)?;
    }
    if table_exists(&conn, "call_log")? {
        records.calls = read_calls(&conn)?;
    }

    tracing::debug!(
        path = %path.display(),
        schema = ?schema,
        messages = records.messages.len(),
        threads = records.threads.len(),
        contacts = records.contacts.len(),
        calls = records.calls.len(),
        "chat db read"
    );
    Ok(records)
}

pub fn detect_schema(conn: &Connection) -> Result<Option<SchemaKind>, AppError> {
    if table_exists(conn, "messages")? {
        Ok(Some(SchemaKind::Legacy))
    } else if table_exists(conn, "message")? {
        Ok(Some(SchemaKind::Modern))
    } else {
        Ok(None)
    }
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool, AppError> {
    let found: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |row| row.get(0),
        )
        .optional()
        .map_err(db_err)?;
    Ok(found.is_some())
}

fn read_threads(conn: &Connection) -> Result<Vec<ChatThread>, AppError> {
    let mut stmt = conn
        .prepare(
            "SELECT j.raw_string, c.subject, c.created_timestamp, c.sort_timestamp, \
                    c.archived, c.hidden, c.unseen_message_count \
             FROM chat c JOIN jid j ON c.jid_row_id = j._id",
        )
        .map_err(db_err)?;

    let rows = stmt
        .query_map([], |row| {
            Ok(ChatThread {
                chat_jid: row.get(0)?,
                subject: row.get(1)?,
                created_ts_ms: row.get(2)?,
                sort_ts_ms: row.get(3)?,
                archived: row.get::<_, Option<i64>>(4)?.unwrap_or(0) != 0,
                hidden: row.get::<_, Option<i64>>(5)?.unwrap_or(0) != 0,
                unseen_count: row.get(6)?,
            })
        })
        .map_err(db_err)?;

    collect_rows(rows)
}

fn read_contacts(conn: &Connection) -> Result<Vec<ChatContact>, AppError> {
    let mut stmt = conn
        .prepare("SELECT raw_string, user FROM jid WHERE raw_string IS NOT NULL")
        .map_err(db_err)?;

    let rows = stmt
        .query_map([], |row| {
            Ok(ChatContact {
                jid: row.get(0)?,
                display_name: None,
                phone_number: row.get(1)?,
            })
        })
        .map_err(db_err)?;

    collect_rows(rows)
}

fn read_calls(conn: &Connection) -> Result<Vec<ChatCall>, AppError> {
    let mut stmt = conn
        .prepare(
            "SELECT cl.call_id, j.raw_string, cl.from_me, cl.video_call, cl.duration, \
                    cl.call_result, cl.bytes_transferred, cl.group_jid_row_id \
             FROM call_log cl LEFT JOIN jid j ON cl.jid_row_id = j._id \
             WHERE cl.call_id IS NOT NULL",
        )
        .map_err(db_err)?;

    let rows = stmt
        .query_map([], |row| {
            let from_me = row.get::<_, Option<i64>>(2)?.unwrap_or(0) != 0;
            let video = row.get::<_, Option<i64>>(3)?.unwrap_or(0) != 0;
            let result: Option<i64> = row.get(5)?;
            let group_row: Option<i64> = row.get(7)?;
            Ok(ChatCall {
                call_id: row.get(0)?,
                jid: row.get(1)?,
                direction: ChatCall::direction_from_flag(from_me).to_string(),
                call_kind: ChatCall::kind_from_flag(video).to_string(),
                duration_seconds: row.get(4)?,
                // NULL result codes coerce to 0, same as the vendor export.
                status: ChatCall::status_from_result(result.unwrap_or(0)),
                bytes_transferred: row.get(6)?,
                is_group_call: group_row.unwrap_or(0) > 0,
            })
        })
        .map_err(db_err)?;

    collect_rows(rows)
}

/// Malformed rows are skipped; row-level damage in carved databases is
/// routine and must not sink the whole file.
fn collect_rows<T>(
    rows: impl Iterator<Item = Result<T, rusqlite::Error>>,
) -> Result<Vec<T>, AppError> {
    let mut out = Vec::new();
    for row in rows {
        match row {
            Ok(record) => out.push(record),
            Err(e) => tracing::warn!(error = %e, "skipping unreadable chat db row"),
        }
    }
    Ok(out)
}

pub(crate) fn db_err(e: rusqlite::Error) -> AppError {
    AppError::Format(format!("chat db query: {e}"))
}
