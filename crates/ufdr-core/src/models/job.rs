use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The six extraction domains read from the evidence tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Apps,
    CallLogs,
    Messages,
    Locations,
    Contacts,
    Browsing,
}

impl Domain {
    pub const ALL: [Domain; 6] = [
        Domain::Apps,
        Domain::CallLogs,
        Domain::Messages,
        Domain::Locations,
        Domain::Contacts,
        Domain::Browsing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Apps => "apps",
            Domain::CallLogs => "call_logs",
            Domain::Messages => "messages",
            Domain::Locations => "locations",
            Domain::Contacts => "contacts",
            Domain::Browsing => "browsing",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "apps" => Domain::Apps,
            "call_logs" => Domain::CallLogs,
            "messages" => Domain::Messages,
            "locations" => Domain::Locations,
            "contacts" => Domain::Contacts,
            "browsing" => Domain::Browsing,
            _ => return None,
        })
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "pending" => JobStatus::Pending,
            "processing" => JobStatus::Processing,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => return None,
        })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Per-domain extraction status for one upload. Domains are fully
/// independent; a terminal status never reverts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionJob {
    pub id: Uuid,
    pub upload_id: Uuid,
    /// Domain label; the chat-database pass uses its own label
    /// (`chat_messages`) alongside the six evidence-tree domains.
    pub domain: String,
    pub status: JobStatus,
    pub total_count: i64,
    pub processed_count: i64,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domains_cover_all_six() {
        assert_eq!(Domain::ALL.len(), 6);
        for d in Domain::ALL {
            assert_eq!(Domain::parse(d.as_str()), Some(d));
        }
    }

    #[test]
    fn terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }
}
