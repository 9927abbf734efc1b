//! Records recovered from embedded chat databases (msgstore/wa.db).
//!
//! These are independent of the evidence-tree domains; the same upload
//! can yield both, and rotated backup copies of the database are merged
//! by natural key before loading.

use serde::{Deserialize, Serialize};

/// Media carried by a chat message, flattened from either schema layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaDescriptor {
    pub local_path: Option<String>,
    pub url: Option<String>,
    pub mime_type: Option<String>,
    pub size: Option<i64>,
    pub name: Option<String>,
    pub hash: Option<String>,
    pub duration_seconds: Option<i64>,
    pub caption: Option<String>,
}

impl MediaDescriptor {
    pub fn is_empty(&self) -> bool {
        self.local_path.is_none()
            && self.url.is_none()
            && self.mime_type.is_none()
            && self.size.is_none()
            && self.name.is_none()
            && self.hash.is_none()
            && self.duration_seconds.is_none()
            && self.caption.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Vendor message key; natural key is (msg_id, chat_jid).
    pub msg_id: String,
    pub chat_jid: String,
    pub sender_jid: Option<String>,
    pub from_me: bool,
    pub text: Option<String>,
    pub message_type: Option<i64>,
    pub sent_ts_ms: Option<i64>,
    pub received_ts_ms: Option<i64>,
    pub delivery_status: Option<i64>,
    pub starred: bool,
    pub media: Option<MediaDescriptor>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Row id of the quoted message, when this is a reply.
    pub quoted_row_id: Option<i64>,
    pub forwarded: bool,
    pub mentioned_jids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatThread {
    /// Natural key.
    pub chat_jid: String,
    pub subject: Option<String>,
    pub created_ts_ms: Option<i64>,
    pub sort_ts_ms: Option<i64>,
    pub archived: bool,
    pub hidden: bool,
    pub unseen_count: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatContact {
    /// Natural key.
    pub jid: String,
    pub display_name: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCall {
    /// Natural key.
    pub call_id: String,
    pub jid: Option<String>,
    pub direction: String,
    pub call_kind: String,
    pub duration_seconds: Option<i64>,
    pub status: String,
    pub bytes_transferred: Option<i64>,
    pub is_group_call: bool,
}

impl ChatCall {
    pub fn direction_from_flag(from_me: bool) -> &'static str {
        if from_me {
            "outgoing"
        } else {
            "incoming"
        }
    }

    pub fn kind_from_flag(video: bool) -> &'static str {
        if video {
            "video"
        } else {
            "voice"
        }
    }

    /// Vendor result codes observed in the call_log table.
    pub fn status_from_result(code: i64) -> String {
        match code {
            5 => "completed".to_string(),
            1 => "missed".to_string(),
            2 => "rejected".to_string(),
            3 => "cancelled".to_string(),
            other => format!("unknown_{other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_result_codes_map_to_statuses() {
        assert_eq!(ChatCall::status_from_result(5), "completed");
        assert_eq!(ChatCall::status_from_result(1), "missed");
        assert_eq!(ChatCall::status_from_result(2), "rejected");
        assert_eq!(ChatCall::status_from_result(3), "cancelled");
        assert_eq!(ChatCall::status_from_result(0), "unknown_0");
        assert_eq!(ChatCall::status_from_result(42), "unknown_42");
    }

    #[test]
    fn call_flags_map_to_labels() {
        assert_eq!(ChatCall::direction_from_flag(true), "outgoing");
        assert_eq!(ChatCall::direction_from_flag(false), "incoming");
        assert_eq!(ChatCall::kind_from_flag(true), "video");
        assert_eq!(ChatCall::kind_from_flag(false), "voice");
    }

    #[test]
    fn empty_media_descriptor_detected() {
        assert!(MediaDescriptor::default().is_empty());
        let media = MediaDescriptor {
            mime_type: Some("image/jpeg".to_string()),
            ..Default::default()
        };
        assert!(!media.is_empty());
    }
}
