pub mod chat;
pub mod evidence;
pub mod job;
pub mod progress;
pub mod upload;

pub use chat::{ChatCall, ChatContact, ChatMessage, ChatThread, MediaDescriptor};
pub use evidence::{
    Attachment, BrowsingEntry, BrowsingKind, CallRecord, ContactEntry, ContactRecord,
    InstalledApp, LocationRecord, MessageRecord, Party, PartyRole,
};
pub use job::{Domain, ExtractionJob, JobStatus};
pub use progress::{DomainProgress, ExtractionProgress, OverallStatus};
pub use upload::{UploadSession, UploadStatus};
