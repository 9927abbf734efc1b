//! Extraction progress as published to the fast store and mirrored on
//! the upload row.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::job::Domain;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl OverallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Pending => "pending",
            OverallStatus::Running => "running",
            OverallStatus::Completed => "completed",
            OverallStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainProgress {
    pub extracted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-upload progress: a coarse status plus one flag per domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionProgress {
    /// Coarse pipeline status: "pending", "running", "done", "failed".
    pub status: String,
    /// Keyed by domain label; BTreeMap keeps serialized output stable.
    pub domains: BTreeMap<String, DomainProgress>,
}

impl ExtractionProgress {
    pub fn new(status: &str) -> Self {
        let mut domains = BTreeMap::new();
        for d in Domain::ALL {
            domains.insert(d.as_str().to_string(), DomainProgress::default());
        }
        ExtractionProgress {
            status: status.to_string(),
            domains,
        }
    }

    pub fn mark_extracted(&mut self, domain: Domain) {
        self.domains.entry(domain.as_str().to_string()).or_default().extracted = true;
    }

    pub fn record_error(&mut self, domain: Domain, error: impl Into<String>) {
        self.domains.entry(domain.as_str().to_string()).or_default().error =
            Some(error.into());
    }

    /// Completed only when the pipeline finished and every domain flag is
    /// set; any recorded domain error makes the overall status failed.
    pub fn overall_status(&self) -> OverallStatus {
        if self.status == "failed" || self.domains.values().any(|d| d.error.is_some()) {
            return OverallStatus::Failed;
        }
        if self.status == "done" && self.domains.values().all(|d| d.extracted) {
            return OverallStatus::Completed;
        }
        if self.status == "running" || self.status == "done" {
            return OverallStatus::Running;
        }
        OverallStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_requires_done_and_all_flags() {
        let mut p = ExtractionProgress::new("done");
        assert_eq!(p.overall_status(), OverallStatus::Running);
        for d in Domain::ALL {
            p.mark_extracted(d);
        }
        assert_eq!(p.overall_status(), OverallStatus::Completed);
    }

    #[test]
    fn any_domain_error_means_failed() {
        let mut p = ExtractionProgress::new("done");
        for d in Domain::ALL {
            p.mark_extracted(d);
        }
        p.record_error(Domain::Browsing, "loader unavailable");
        assert_eq!(p.overall_status(), OverallStatus::Failed);
    }

    #[test]
    fn running_while_flags_outstanding() {
        let mut p = ExtractionProgress::new("running");
        p.mark_extracted(Domain::Apps);
        assert_eq!(p.overall_status(), OverallStatus::Running);
    }

    #[test]
    fn pipeline_failure_dominates() {
        let mut p = ExtractionProgress::new("failed");
        for d in Domain::ALL {
            p.mark_extracted(d);
        }
        assert_eq!(p.overall_status(), OverallStatus::Failed);
    }
}
