//! Domain entities extracted from the evidence tree.
//!
//! Every entity keeps the original node as `raw` JSON so no forensic
//! detail is lost to normalization, along with the vendor-reported
//! deleted state and decoding confidence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartyRole {
    From,
    To,
}

impl PartyRole {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "From" => Some(PartyRole::From),
            "To" => Some(PartyRole::To),
            _ => None,
        }
    }
}

/// A call or message participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Party {
    pub role: PartyRole,
    pub identifier: Option<String>,
    pub name: Option<String>,
    pub is_phone_owner: bool,
}

/// A file carried by a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub attachment_type: Option<String>,
    pub filename: Option<String>,
    pub local_path: Option<String>,
    pub size: Option<i64>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstalledApp {
    /// Natural key within one upload.
    pub app_identifier: String,
    pub name: Option<String>,
    pub version: Option<String>,
    pub guid: Option<String>,
    pub install_ts: Option<i64>,
    pub install_time: Option<DateTime<Utc>>,
    pub last_launched_ts: Option<i64>,
    pub last_launched: Option<DateTime<Utc>>,
    pub decoding_status: Option<String>,
    pub is_emulatable: Option<bool>,
    pub operation_mode: Option<String>,
    pub permissions: Vec<String>,
    pub categories: Vec<String>,
    pub directory_paths: Vec<String>,
    pub deleted_state: Option<String>,
    pub decoding_confidence: Option<String>,
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    /// Vendor model id; natural key within one upload.
    pub model_id: String,
    pub source_app: Option<String>,
    pub direction: Option<String>,
    pub call_type: Option<String>,
    pub status: Option<String>,
    pub timestamp_ms: Option<i64>,
    pub timestamp: Option<DateTime<Utc>>,
    /// Duration exactly as reported, alongside the parsed seconds.
    pub duration_raw: Option<String>,
    pub duration_seconds: Option<i64>,
    pub country_code: Option<String>,
    pub network_code: Option<String>,
    pub account: Option<String>,
    pub is_video_call: Option<bool>,
    pub parties: Vec<Party>,
    pub from_identifier: Option<String>,
    pub from_name: Option<String>,
    pub to_identifier: Option<String>,
    pub to_name: Option<String>,
    pub deleted_state: Option<String>,
    pub decoding_confidence: Option<String>,
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Vendor model id; natural key within one upload.
    pub model_id: String,
    pub source_app: String,
    pub body: Option<String>,
    pub message_type: Option<String>,
    pub platform: Option<String>,
    pub timestamp_ms: Option<i64>,
    pub timestamp: Option<DateTime<Utc>>,
    pub parties: Vec<Party>,
    pub attachments: Vec<Attachment>,
    pub from_identifier: Option<String>,
    pub from_name: Option<String>,
    pub to_identifier: Option<String>,
    pub to_name: Option<String>,
    pub deleted_state: Option<String>,
    pub decoding_confidence: Option<String>,
    pub raw: serde_json::Value,
}

impl MessageRecord {
    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }

    pub fn attachment_count(&self) -> i32 {
        self.attachments.len() as i32
    }
}

/// Which evidence-tree node a browsing entry came from. The three node
/// kinds normalize into one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowsingKind {
    VisitedPage,
    SearchedItem,
    WebBookmark,
}

impl BrowsingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowsingKind::VisitedPage => "visited_page",
            BrowsingKind::SearchedItem => "searched_item",
            BrowsingKind::WebBookmark => "web_bookmark",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowsingEntry {
    pub model_id: String,
    pub entry_kind: BrowsingKind,
    pub source_browser: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub search_query: Option<String>,
    pub bookmark_path: Option<String>,
    pub last_visited_ms: Option<i64>,
    pub last_visited: Option<DateTime<Utc>>,
    pub visit_count: Option<i64>,
    pub url_cache_file: Option<String>,
    pub deleted_state: Option<String>,
    pub decoding_confidence: Option<String>,
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationRecord {
    pub model_id: String,
    pub source_app: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    pub accuracy: Option<f64>,
    pub bearing: Option<f64>,
    pub speed: Option<f64>,
    pub location_type: Option<String>,
    pub category: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub timestamp_ms: Option<i64>,
    pub timestamp: Option<DateTime<Utc>>,
    pub platform: Option<String>,
    pub confidence: Option<String>,
    pub deleted_state: Option<String>,
    pub decoding_confidence: Option<String>,
    pub raw: serde_json::Value,
}

impl LocationRecord {
    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    pub fn has_address(&self) -> bool {
        self.street.is_some()
            || self.city.is_some()
            || self.state.is_some()
            || self.country.is_some()
            || self.postal_code.is_some()
    }
}

/// One typed way of reaching a contact (phone number, email, user id, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactEntry {
    pub entry_type: String,
    pub category: Option<String>,
    pub value: String,
    pub domain: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactRecord {
    pub model_id: String,
    pub source_app: Option<String>,
    pub service_identifier: Option<String>,
    pub name: Option<String>,
    pub account: Option<String>,
    pub contact_type: Option<String>,
    pub group: Option<String>,
    pub created_ms: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
    pub notes: Vec<String>,
    pub interaction_statuses: Vec<String>,
    pub user_tags: Vec<String>,
    pub entries: Vec<ContactEntry>,
    pub deleted_state: Option<String>,
    pub decoding_confidence: Option<String>,
    pub raw: serde_json::Value,
}
