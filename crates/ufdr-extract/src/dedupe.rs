//! Natural-key deduplication with last-write-wins merging.
//!
//! Rotated backup databases and re-decoded evidence trees produce
//! duplicates of the same record. Within one upload they collapse to a
//! single record per natural key: a later duplicate overwrites fields it
//! actually has values for and leaves the rest alone.

use std::collections::HashMap;
use std::hash::Hash;

use ufdr_core::models::{
    BrowsingEntry, CallRecord, ChatCall, ChatContact, ChatMessage, ChatThread, ContactRecord,
    InstalledApp, LocationRecord, MessageRecord,
};

/// Collapse `items` onto their natural keys, preserving first-seen
/// order. `merge` folds a later duplicate into the record already held.
pub fn dedupe_by_key<T, K, FK, FM>(items: Vec<T>, key: FK, mut merge: FM) -> Vec<T>
where
    K: Hash + Eq,
    FK: Fn(&T) -> K,
    FM: FnMut(&mut T, T),
{
    let mut out: Vec<T> = Vec::with_capacity(items.len());
    let mut index: HashMap<K, usize> = HashMap::new();

    for item in items {
        match index.get(&key(&item)) {
            Some(&i) => merge(&mut out[i], item),
            None => {
                index.insert(key(&item), out.len());
                out.push(item);
            }
        }
    }
    out
}

fn take_some<T>(existing: &mut Option<T>, later: Option<T>) {
    if later.is_some() {
        *existing = later;
    }
}

fn take_nonempty<T>(existing: &mut Vec<T>, later: Vec<T>) {
    if !later.is_empty() {
        *existing = later;
    }
}

pub fn dedupe_apps(apps: Vec<InstalledApp>) -> Vec<InstalledApp> {
    dedupe_by_key(apps, |a| a.app_identifier.clone(), |a, b| {
        take_some(&mut a.name, b.name);
        take_some(&mut a.version, b.version);
        take_some(&mut a.guid, b.guid);
        take_some(&mut a.install_ts, b.install_ts);
        take_some(&mut a.install_time, b.install_time);
        take_some(&mut a.last_launched_ts, b.last_launched_ts);
        take_some(&mut a.last_launched, b.last_launched);
        take_some(&mut a.decoding_status, b.decoding_status);
        take_some(&mut a.is_emulatable, b.is_emulatable);
        take_some(&mut a.operation_mode, b.operation_mode);
        take_nonempty(&mut a.permissions, b.permissions);
        take_nonempty(&mut a.categories, b.categories);
        take_nonempty(&mut a.directory_paths, b.directory_paths);
        take_some(&mut a.deleted_state, b.deleted_state);
        take_some(&mut a.decoding_confidence, b.decoding_confidence);
        a.raw = b.raw;
    })
}

pub fn dedupe_calls(calls: Vec<CallRecord>) -> Vec<CallRecord> {
    dedupe_by_key(calls, |c| c.model_id.clone(), |a, b| {
        take_some(&mut a.source_app, b.source_app);
        take_some(&mut a.direction, b.direction);
        take_some(&mut a.call_type, b.call_type);
        take_some(&mut a.status, b.status);
        take_some(&mut a.timestamp_ms, b.timestamp_ms);
        take_some(&mut a.timestamp, b.timestamp);
        take_some(&mut a.duration_raw, b.duration_raw);
        take_some(&mut a.duration_seconds, b.duration_seconds);
        take_some(&mut a.country_code, b.country_code);
        take_some(&mut a.network_code, b.network_code);
        take_some(&mut a.account, b.account);
        take_some(&mut a.is_video_call, b.is_video_call);
        take_nonempty(&mut a.parties, b.parties);
        take_some(&mut a.from_identifier, b.from_identifier);
        take_some(&mut a.from_name, b.from_name);
        take_some(&mut a.to_identifier, b.to_identifier);
        take_some(&mut a.to_name, b.to_name);
        take_some(&mut a.deleted_state, b.deleted_state);
        take_some(&mut a.decoding_confidence, b.decoding_confidence);
        a.raw = b.raw;
    })
}

pub fn dedupe_messages(messages: Vec<MessageRecord>) -> Vec<MessageRecord> {
    dedupe_by_key(messages, |m| m.model_id.clone(), |a, b| {
        a.source_app = b.source_app;
        take_some(&mut a.body, b.body);
        take_some(&mut a.message_type, b.message_type);
        take_some(&mut a.platform, b.platform);
        take_some(&mut a.timestamp_ms, b.timestamp_ms);
        take_some(&mut a.timestamp, b.timestamp);
        take_nonempty(&mut a.parties, b.parties);
        take_nonempty(&mut a.attachments, b.attachments);
        take_some(&mut a.from_identifier, b.from_identifier);
        take_some(&mut a.from_name, b.from_name);
        take_some(&mut a.to_identifier, b.to_identifier);
        take_some(&mut a.to_name, b.to_name);
        take_some(&mut a.deleted_state, b.deleted_state);
        take_some(&mut a.decoding_confidence, b.decoding_confidence);
        a.raw = b.raw;
    })
}

pub fn dedupe_locations(locations: Vec<LocationRecord>) -> Vec<LocationRecord> {
    dedupe_by_key(locations, |l| l.model_id.clone(), |a, b| {
        take_some(&mut a.source_app, b.source_app);
        take_some(&mut a.latitude, b.latitude);
        take_some(&mut a.longitude, b.longitude);
        take_some(&mut a.altitude, b.altitude);
        take_some(&mut a.accuracy, b.accuracy);
        take_some(&mut a.bearing, b.bearing);
        take_some(&mut a.speed, b.speed);
        take_some(&mut a.location_type, b.location_type);
        take_some(&mut a.category, b.category);
        take_some(&mut a.street, b.street);
        take_some(&mut a.city, b.city);
        take_some(&mut a.state, b.state);
        take_some(&mut a.country, b.country);
        take_some(&mut a.postal_code, b.postal_code);
        take_some(&mut a.timestamp_ms, b.timestamp_ms);
        take_some(&mut a.timestamp, b.timestamp);
        take_some(&mut a.platform, b.platform);
        take_some(&mut a.confidence, b.confidence);
        take_some(&mut a.deleted_state, b.deleted_state);
        take_some(&mut a.decoding_confidence, b.decoding_confidence);
        a.raw = b.raw;
    })
}

pub fn dedupe_contacts(contacts: Vec<ContactRecord>) -> Vec<ContactRecord> {
    dedupe_by_key(contacts, |c| c.model_id.clone(), |a, b| {
        take_some(&mut a.source_app, b.source_app);
        take_some(&mut a.service_identifier, b.service_identifier);
        take_some(&mut a.name, b.name);
        take_some(&mut a.account, b.account);
        take_some(&mut a.contact_type, b.contact_type);
        take_some(&mut a.group, b.group);
        take_some(&mut a.created_ms, b.created_ms);
        take_some(&mut a.created_at, b.created_at);
        take_nonempty(&mut a.notes, b.notes);
        take_nonempty(&mut a.interaction_statuses, b.interaction_statuses);
        take_nonempty(&mut a.user_tags, b.user_tags);
        take_nonempty(&mut a.entries, b.entries);
        take_some(&mut a.deleted_state, b.deleted_state);
        take_some(&mut a.decoding_confidence, b.decoding_confidence);
        a.raw = b.raw;
    })
}

pub fn dedupe_browsing(entries: Vec<BrowsingEntry>) -> Vec<BrowsingEntry> {
    dedupe_by_key(entries, |e| e.model_id.clone(), |a, b| {
        a.entry_kind = b.entry_kind;
        take_some(&mut a.source_browser, b.source_browser);
        take_some(&mut a.url, b.url);
        take_some(&mut a.title, b.title);
        take_some(&mut a.search_query, b.search_query);
        take_some(&mut a.bookmark_path, b.bookmark_path);
        take_some(&mut a.last_visited_ms, b.last_visited_ms);
        take_some(&mut a.last_visited, b.last_visited);
        take_some(&mut a.visit_count, b.visit_count);
        take_some(&mut a.url_cache_file, b.url_cache_file);
        take_some(&mut a.deleted_state, b.deleted_state);
        take_some(&mut a.decoding_confidence, b.decoding_confidence);
        a.raw = b.raw;
    })
}

pub fn dedupe_chat_messages(messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
    dedupe_by_key(
        messages,
        |m| (m.msg_id.clone(), m.chat_jid.clone()),
        |a, b| {
            take_some(&mut a.sender_jid, b.sender_jid);
            a.from_me = b.from_me;
            take_some(&mut a.text, b.text);
            take_some(&mut a.message_type, b.message_type);
            take_some(&mut a.sent_ts_ms, b.sent_ts_ms);
            take_some(&mut a.received_ts_ms, b.received_ts_ms);
            take_some(&mut a.delivery_status, b.delivery_status);
            a.starred = a.starred || b.starred;
            take_some(&mut a.media, b.media);
            take_some(&mut a.latitude, b.latitude);
            take_some(&mut a.longitude, b.longitude);
            take_some(&mut a.quoted_row_id, b.quoted_row_id);
            a.forwarded = a.forwarded || b.forwarded;
            take_nonempty(&mut a.mentioned_jids, b.mentioned_jids);
        },
    )
}

pub fn dedupe_chat_threads(threads: Vec<ChatThread>) -> Vec<ChatThread> {
    dedupe_by_key(threads, |t| t.chat_jid.clone(), |a, b| {
        take_some(&mut a.subject, b.subject);
        take_some(&mut a.created_ts_ms, b.created_ts_ms);
        take_some(&mut a.sort_ts_ms, b.sort_ts_ms);
        a.archived = a.archived || b.archived;
        a.hidden = a.hidden || b.hidden;
        take_some(&mut a.unseen_count, b.unseen_count);
    })
}

pub fn dedupe_chat_contacts(contacts: Vec<ChatContact>) -> Vec<ChatContact> {
    dedupe_by_key(contacts, |c| c.jid.clone(), |a, b| {
        take_some(&mut a.display_name, b.display_name);
        take_some(&mut a.phone_number, b.phone_number);
    })
}

pub fn dedupe_chat_calls(calls: Vec<ChatCall>) -> Vec<ChatCall> {
    dedupe_by_key(calls, |c| c.call_id.clone(), |a, b| {
        take_some(&mut a.jid, b.jid);
        a.direction = b.direction;
        a.call_kind = b.call_kind;
        take_some(&mut a.duration_seconds, b.duration_seconds);
        a.status = b.status;
        take_some(&mut a.bytes_transferred, b.bytes_transferred);
        a.is_group_call = a.is_group_call || b.is_group_call;
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(id: &str, name: Option<&str>, version: Option<&str>) -> InstalledApp {
        InstalledApp {
            app_identifier: id.to_string(),
            name: name.map(str::to_string),
            version: version.map(str::to_string),
            guid: None,
            install_ts: None,
            install_time: None,
            last_launched_ts: None,
            last_launched: None,
            decoding_status: None,
            is_emulatable: None,
            operation_mode: None,
            permissions: vec![],
            categories: vec![],
            directory_paths: vec![],
            deleted_state: None,
            decoding_confidence: None,
            raw: serde_json::Value::Null,
        }
    }

    #[test]
    fn later_duplicate_wins_on_non_null_fields() {
        let apps = vec![
            app("com.x", Some("Old Name"), Some("1.0")),
            app("com.x", Some("New Name"), None),
        ];
        let deduped = dedupe_apps(apps);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].name.as_deref(), Some("New Name"));
        // Later record had no version; existing value survives.
        assert_eq!(deduped[0].version.as_deref(), Some("1.0"));
    }

    #[test]
    fn distinct_keys_are_kept_in_first_seen_order() {
        let apps = vec![
            app("com.b", None, None),
            app("com.a", None, None),
            app("com.b", Some("B"), None),
        ];
        let deduped = dedupe_apps(apps);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].app_identifier, "com.b");
        assert_eq!(deduped[1].app_identifier, "com.a");
    }

    #[test]
    fn chat_messages_key_on_msg_and_chat() {
        let m = |msg_id: &str, chat: &str, text: Option<&str>| ChatMessage {
            msg_id: msg_id.to_string(),
            chat_jid: chat.to_string(),
            sender_jid: None,
            from_me: false,
            text: text.map(str::to_string),
            message_type: None,
            sent_ts_ms: None,
            received_ts_ms: None,
            delivery_status: None,
            starred: false,
            media: None,
            latitude: None,
            longitude: None,
            quoted_row_id: None,
            forwarded: false,
            mentioned_jids: vec![],
        };
        let deduped = dedupe_chat_messages(vec![
            m("k1", "chat-a", Some("hello")),
            m("k1", "chat-b", Some("different thread")),
            m("k1", "chat-a", None),
        ]);
        assert_eq!(deduped.len(), 2);
        // The backup copy with a null body did not erase the text.
        assert_eq!(deduped[0].text.as_deref(), Some("hello"));
    }

    #[test]
    fn dedup_is_idempotent() {
        let apps = vec![
            app("com.x", Some("A"), None),
            app("com.x", None, Some("2.0")),
        ];
        let once = dedupe_apps(apps);
        let twice = dedupe_apps(once.clone());
        assert_eq!(once.len(), twice.len());
        assert_eq!(twice[0].name.as_deref(), Some("A"));
        assert_eq!(twice[0].version.as_deref(), Some("2.0"));
    }
}
