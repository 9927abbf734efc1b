//! The extraction pipeline: stage the archive, parse the evidence tree
//! once, load the six domains, then read any embedded chat databases.
//!
//! Domains are isolated: one domain failing its load leaves the other
//! five untouched and the pipeline still finishes. Only staging failure
//! fails the upload as a whole.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use ufdr_core::models::{
    BrowsingEntry, CallRecord, ContactRecord, Domain, ExtractionProgress, InstalledApp,
    LocationRecord, MessageRecord, UploadStatus,
};
use ufdr_core::AppError;
use ufdr_db::loaders::{
    AppLoader, BrowsingLoader, CallLoader, ChatLoader, ContactLoader, LocationLoader,
    MessageLoader,
};
use ufdr_db::{ExtractionJobRepository, IngestTask, UploadSessionRepository};
use ufdr_extract::chatdb::{self, ChatDbRecords};
use ufdr_extract::dedupe;
use ufdr_extract::xml::{parse_report, DomainRecords};
use ufdr_extract::Stager;
use ufdr_storage::MultipartStore;
use uuid::Uuid;

use crate::progress::ProgressPublisher;

/// Job label for the embedded chat-database pass, alongside the six
/// evidence-tree domain labels.
pub const CHAT_PASS_LABEL: &str = "chat_messages";

/// Bookkeeping seam for per-domain job rows. Production uses the
/// Postgres repository; tests substitute an in-memory recorder.
#[async_trait]
pub trait JobTracker: Send + Sync {
    async fn create(&self, upload_id: Uuid, domain: &str) -> Result<(), AppError>;
    async fn mark_processing(&self, upload_id: Uuid, domain: &str) -> Result<(), AppError>;
    async fn set_total(&self, upload_id: Uuid, domain: &str, total: i64) -> Result<(), AppError>;
    async fn set_processed(
        &self,
        upload_id: Uuid,
        domain: &str,
        processed: i64,
    ) -> Result<(), AppError>;
    async fn mark_completed(
        &self,
        upload_id: Uuid,
        domain: &str,
        total: i64,
        processed: i64,
    ) -> Result<(), AppError>;
    async fn mark_failed(&self, upload_id: Uuid, domain: &str, error: &str)
        -> Result<(), AppError>;
}

#[async_trait]
impl JobTracker for ExtractionJobRepository {
    async fn create(&self, upload_id: Uuid, domain: &str) -> Result<(), AppError> {
        ExtractionJobRepository::create(self, upload_id, domain).await?;
        Ok(())
    }

    async fn mark_processing(&self, upload_id: Uuid, domain: &str) -> Result<(), AppError> {
        ExtractionJobRepository::mark_processing(self, upload_id, domain).await
    }

    async fn set_total(&self, upload_id: Uuid, domain: &str, total: i64) -> Result<(), AppError> {
        ExtractionJobRepository::set_total(self, upload_id, domain, total).await
    }

    async fn set_processed(
        &self,
        upload_id: Uuid,
        domain: &str,
        processed: i64,
    ) -> Result<(), AppError> {
        ExtractionJobRepository::set_processed(self, upload_id, domain, processed).await
    }

    async fn mark_completed(
        &self,
        upload_id: Uuid,
        domain: &str,
        total: i64,
        processed: i64,
    ) -> Result<(), AppError> {
        ExtractionJobRepository::mark_completed(self, upload_id, domain, total, processed).await
    }

    async fn mark_failed(
        &self,
        upload_id: Uuid,
        domain: &str,
        error: &str,
    ) -> Result<(), AppError> {
        ExtractionJobRepository::mark_failed(self, upload_id, domain, error).await
    }
}

/// Where deduplicated evidence batches land. One method per domain so a
/// single domain's sink failing stays inside that domain.
#[async_trait]
pub trait EvidenceSink: Send + Sync {
    async fn upsert_apps(&self, upload_id: Uuid, batch: &[InstalledApp]) -> Result<(), AppError>;
    async fn upsert_calls(&self, upload_id: Uuid, batch: &[CallRecord]) -> Result<(), AppError>;
    async fn upsert_messages(
        &self,
        upload_id: Uuid,
        batch: &[MessageRecord],
    ) -> Result<(), AppError>;
    async fn upsert_locations(
        &self,
        upload_id: Uuid,
        batch: &[LocationRecord],
    ) -> Result<(), AppError>;
    async fn upsert_contacts(
        &self,
        upload_id: Uuid,
        batch: &[ContactRecord],
    ) -> Result<(), AppError>;
    async fn upsert_browsing(
        &self,
        upload_id: Uuid,
        batch: &[BrowsingEntry],
    ) -> Result<(), AppError>;
}

/// The production sink: one batch loader per domain table.
pub struct PgEvidenceSink {
    apps: AppLoader,
    calls: CallLoader,
    messages: MessageLoader,
    locations: LocationLoader,
    contacts: ContactLoader,
    browsing: BrowsingLoader,
}

impl PgEvidenceSink {
    pub fn new(pool: PgPool) -> Self {
        Self {
            apps: AppLoader::new(pool.clone()),
            calls: CallLoader::new(pool.clone()),
            messages: MessageLoader::new(pool.clone()),
            locations: LocationLoader::new(pool.clone()),
            contacts: ContactLoader::new(pool.clone()),
            browsing: BrowsingLoader::new(pool),
        }
    }
}

#[async_trait]
impl EvidenceSink for PgEvidenceSink {
    async fn upsert_apps(&self, upload_id: Uuid, batch: &[InstalledApp]) -> Result<(), AppError> {
        self.apps.upsert_batch(upload_id, batch).await
    }

    async fn upsert_calls(&self, upload_id: Uuid, batch: &[CallRecord]) -> Result<(), AppError> {
        self.calls.upsert_batch(upload_id, batch).await
    }

    async fn upsert_messages(
        &self,
        upload_id: Uuid,
        batch: &[MessageRecord],
    ) -> Result<(), AppError> {
        self.messages.upsert_batch(upload_id, batch).await
    }

    async fn upsert_locations(
        &self,
        upload_id: Uuid,
        batch: &[LocationRecord],
    ) -> Result<(), AppError> {
        self.locations.upsert_batch(upload_id, batch).await
    }

    async fn upsert_contacts(
        &self,
        upload_id: Uuid,
        batch: &[ContactRecord],
    ) -> Result<(), AppError> {
        self.contacts.upsert_batch(upload_id, batch).await
    }

    async fn upsert_browsing(
        &self,
        upload_id: Uuid,
        batch: &[BrowsingEntry],
    ) -> Result<(), AppError> {
        self.browsing.upsert_batch(upload_id, batch).await
    }
}

pub struct IngestPipeline {
    store: Arc<dyn MultipartStore>,
    sessions: UploadSessionRepository,
    jobs: Arc<dyn JobTracker>,
    evidence: Arc<dyn EvidenceSink>,
    chat: ChatLoader,
    publisher: ProgressPublisher,
}

impl IngestPipeline {
    pub fn new(
        pool: PgPool,
        store: Arc<dyn MultipartStore>,
        publisher: ProgressPublisher,
    ) -> Self {
        Self {
            store,
            sessions: UploadSessionRepository::new(pool.clone()),
            jobs: Arc::new(ExtractionJobRepository::new(pool.clone())),
            evidence: Arc::new(PgEvidenceSink::new(pool.clone())),
            chat: ChatLoader::new(pool),
            publisher,
        }
    }

    /// Process one claimed ingest task end to end.
    ///
    /// Returns `Err` only for failures that sink the whole upload
    /// (staging, bookkeeping). Domain-level failures are recorded on
    /// their job rows and in the published progress, and the upload
    /// still finishes as done.
    #[tracing::instrument(skip(self, task), fields(upload_id = %task.upload_id, key = %task.key))]
    pub async fn process(&self, task: &IngestTask) -> Result<(), AppError> {
        let upload_id = task.upload_id;

        self.sessions
            .set_ingest_status(upload_id, UploadStatus::Processing, "processing", None)
            .await?;
        for domain in Domain::ALL {
            self.jobs.create(upload_id, domain.as_str()).await?;
        }
        self.jobs.create(upload_id, CHAT_PASS_LABEL).await?;

        let mut progress = ExtractionProgress::new("running");
        self.publisher.publish(upload_id, &progress).await;

        let staged = match Stager::new(self.store.as_ref()).stage(&task.key).await {
            Ok(staged) => staged,
            Err(e) => {
                return self.fail_upload(upload_id, &mut progress, e).await;
            }
        };

        match self.parse_evidence_tree(&staged.report_path, staged.is_forensic_package) {
            Ok(records) => {
                self.run_domains(upload_id, records, &mut progress).await;
            }
            Err(e) => {
                // The whole document is unreadable; every domain fails,
                // but the chat pass below may still recover messages.
                tracing::warn!(error = %e, "evidence tree unreadable");
                for domain in Domain::ALL {
                    let _ = self
                        .jobs
                        .mark_failed(upload_id, domain.as_str(), &e.to_string())
                        .await;
                    progress.record_error(domain, e.to_string());
                }
            }
        }
        self.publisher.publish(upload_id, &progress).await;

        if let Err(e) = self
            .run_chat_pass(upload_id, &staged.chat_db_paths)
            .await
        {
            tracing::warn!(error = %e, "chat database pass failed");
            let _ = self
                .jobs
                .mark_failed(upload_id, CHAT_PASS_LABEL, &e.to_string())
                .await;
        }
        drop(staged);

        progress.status = "done".to_string();
        self.publisher.publish(upload_id, &progress).await;
        self.sessions
            .set_ingest_status(upload_id, UploadStatus::Done, "done", None)
            .await?;

        tracing::info!("ingest finished");
        Ok(())
    }

    /// Used by the queue when a task times out or panics before the
    /// pipeline could record anything.
    pub async fn mark_upload_failed(&self, upload_id: Uuid, error: &str) {
        if let Err(e) = self
            .sessions
            .set_ingest_status(upload_id, UploadStatus::Failed, "failed", Some(error))
            .await
        {
            tracing::error!(error = %e, upload_id = %upload_id, "failed to record upload failure");
        }
    }

    async fn fail_upload(
        &self,
        upload_id: Uuid,
        progress: &mut ExtractionProgress,
        error: AppError,
    ) -> Result<(), AppError> {
        progress.status = "failed".to_string();
        self.publisher.publish(upload_id, progress).await;
        for domain in Domain::ALL {
            let _ = self
                .jobs
                .mark_failed(upload_id, domain.as_str(), &error.to_string())
                .await;
        }
        let _ = self
            .jobs
            .mark_failed(upload_id, CHAT_PASS_LABEL, &error.to_string())
            .await;
        self.sessions
            .set_ingest_status(
                upload_id,
                UploadStatus::Failed,
                "failed",
                Some(&error.to_string()),
            )
            .await?;
        Err(error)
    }

    fn parse_evidence_tree(
        &self,
        report_path: &Option<PathBuf>,
        is_forensic_package: bool,
    ) -> Result<DomainRecords, AppError> {
        if !is_forensic_package {
            return Err(AppError::Format(
                "archive is not a forensic package (no evidence tree with database subtree)"
                    .to_string(),
            ));
        }
        let path = report_path
            .as_ref()
            .ok_or_else(|| AppError::Format("evidence tree missing from archive".to_string()))?;
        let file =
            File::open(path).map_err(|e| AppError::Internal(format!("open evidence tree: {e}")))?;
        parse_report(BufReader::new(file))
    }

    /// Run all six domain loads concurrently; each failure stays inside
    /// its own domain.
    async fn run_domains(
        &self,
        upload_id: Uuid,
        records: DomainRecords,
        progress: &mut ExtractionProgress,
    ) {
        let (apps, calls, messages, locations, contacts, browsing) = tokio::join!(
            self.load_apps(upload_id, records.apps),
            self.load_calls(upload_id, records.calls),
            self.load_messages(upload_id, records.messages),
            self.load_locations(upload_id, records.locations),
            self.load_contacts(upload_id, records.contacts),
            self.load_browsing(upload_id, records.browsing),
        );

        let outcomes = [
            (Domain::Apps, apps),
            (Domain::CallLogs, calls),
            (Domain::Messages, messages),
            (Domain::Locations, locations),
            (Domain::Contacts, contacts),
            (Domain::Browsing, browsing),
        ];
        for (domain, outcome) in outcomes {
            match outcome {
                Ok(total) => {
                    tracing::info!(domain = %domain, total, "domain extracted");
                    progress.mark_extracted(domain);
                }
                Err(e) => {
                    tracing::warn!(domain = %domain, error = %e, "domain extraction failed");
                    let _ = self
                        .jobs
                        .mark_failed(upload_id, domain.as_str(), &e.to_string())
                        .await;
                    progress.record_error(domain, e.to_string());
                }
            }
        }
    }

    async fn load_apps(
        &self,
        upload_id: Uuid,
        records: Vec<InstalledApp>,
    ) -> Result<i64, AppError> {
        let label = Domain::Apps.as_str();
        self.jobs.mark_processing(upload_id, label).await?;
        let records = dedupe::dedupe_apps(records);
        let total = records.len() as i64;
        self.jobs.set_total(upload_id, label, total).await?;
        let mut processed = 0i64;
        for chunk in records.chunks(AppLoader::BATCH) {
            self.evidence.upsert_apps(upload_id, chunk).await?;
            processed += chunk.len() as i64;
            self.jobs.set_processed(upload_id, label, processed).await?;
        }
        self.jobs
            .mark_completed(upload_id, label, total, processed)
            .await?;
        Ok(total)
    }

    async fn load_calls(
        &self,
        upload_id: Uuid,
        records: Vec<CallRecord>,
    ) -> Result<i64, AppError> {
        let label = Domain::CallLogs.as_str();
        self.jobs.mark_processing(upload_id, label).await?;
        let records = dedupe::dedupe_calls(records);
        let total = records.len() as i64;
        self.jobs.set_total(upload_id, label, total).await?;
        let mut processed = 0i64;
        for chunk in records.chunks(CallLoader::BATCH) {
            self.evidence.upsert_calls(upload_id, chunk).await?;
            processed += chunk.len() as i64;
            self.jobs.set_processed(upload_id, label, processed).await?;
        }
        self.jobs
            .mark_completed(upload_id, label, total, processed)
            .await?;
        Ok(total)
    }

    async fn load_messages(
        &self,
        upload_id: Uuid,
        records: Vec<MessageRecord>,
    ) -> Result<i64, AppError> {
        let label = Domain::Messages.as_str();
        self.jobs.mark_processing(upload_id, label).await?;
        let records = dedupe::dedupe_messages(records);
        let total = records.len() as i64;
        self.jobs.set_total(upload_id, label, total).await?;
        let mut processed = 0i64;
        for chunk in records.chunks(MessageLoader::BATCH) {
            self.evidence.upsert_messages(upload_id, chunk).await?;
            processed += chunk.len() as i64;
            self.jobs.set_processed(upload_id, label, processed).await?;
        }
        self.jobs
            .mark_completed(upload_id, label, total, processed)
            .await?;
        Ok(total)
    }

    async fn load_locations(
        &self,
        upload_id: Uuid,
        records: Vec<LocationRecord>,
    ) -> Result<i64, AppError> {
        let label = Domain::Locations.as_str();
        self.jobs.mark_processing(upload_id, label).await?;
        let records = dedupe::dedupe_locations(records);
        let total = records.len() as i64;
        self.jobs.set_total(upload_id, label, total).await?;
        let mut processed = 0i64;
        for chunk in records.chunks(LocationLoader::BATCH) {
            self.evidence.upsert_locations(upload_id, chunk).await?;
            processed += chunk.len() as i64;
            self.jobs.set_processed(upload_id, label, processed).await?;
        }
        self.jobs
            .mark_completed(upload_id, label, total, processed)
            .await?;
        Ok(total)
    }

    async fn load_contacts(
        &self,
        upload_id: Uuid,
        records: Vec<ContactRecord>,
    ) -> Result<i64, AppError> {
        let label = Domain::Contacts.as_str();
        self.jobs.mark_processing(upload_id, label).await?;
        let records = dedupe::dedupe_contacts(records);
        let total = records.len() as i64;
        self.jobs.set_total(upload_id, label, total).await?;
        let mut processed = 0i64;
        for chunk in records.chunks(ContactLoader::BATCH) {
            self.evidence.upsert_contacts(upload_id, chunk).await?;
            processed += chunk.len() as i64;
            self.jobs.set_processed(upload_id, label, processed).await?;
        }
        self.jobs
            .mark_completed(upload_id, label, total, processed)
            .await?;
        Ok(total)
    }

    async fn load_browsing(
        &self,
        upload_id: Uuid,
        records: Vec<BrowsingEntry>,
    ) -> Result<i64, AppError> {
        let label = Domain::Browsing.as_str();
        self.jobs.mark_processing(upload_id, label).await?;
        let records = dedupe::dedupe_browsing(records);
        let total = records.len() as i64;
        self.jobs.set_total(upload_id, label, total).await?;
        let mut processed = 0i64;
        for chunk in records.chunks(BrowsingLoader::BATCH) {
            self.evidence.upsert_browsing(upload_id, chunk).await?;
            processed += chunk.len() as i64;
            self.jobs.set_processed(upload_id, label, processed).await?;
        }
        self.jobs
            .mark_completed(upload_id, label, total, processed)
            .await?;
        Ok(total)
    }

    /// Read every staged chat database, merge across rotated backups,
    /// and load. An unreadable file is skipped; the pass fails only when
    /// nothing could be loaded out of files that were present.
    async fn run_chat_pass(
        &self,
        upload_id: Uuid,
        db_paths: &[PathBuf],
    ) -> Result<(), AppError> {
        self.jobs.mark_processing(upload_id, CHAT_PASS_LABEL).await?;

        let mut merged = ChatDbRecords::default();
        let mut readable = 0usize;
        for path in db_paths {
            let path = path.clone();
            let result = tokio::task::spawn_blocking(move || chatdb::read_chat_db(&path))
                .await
                .map_err(|e| AppError::Internal(format!("chat db task: {e}")))?;
            match result {
                Ok(records) => {
                    readable += 1;
                    merged.messages.extend(records.messages);
                    merged.threads.extend(records.threads);
                    merged.contacts.extend(records.contacts);
                    merged.calls.extend(records.calls);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable chat database");
                }
            }
        }
        if readable == 0 && !db_paths.is_empty() {
            return Err(AppError::Format(
                "no chat database could be read".to_string(),
            ));
        }

        let messages = dedupe::dedupe_chat_messages(merged.messages);
        let threads = dedupe::dedupe_chat_threads(merged.threads);
        let contacts = dedupe::dedupe_chat_contacts(merged.contacts);
        let calls = dedupe::dedupe_chat_calls(merged.calls);

        let total = messages.len() as i64;
        self.jobs.set_total(upload_id, CHAT_PASS_LABEL, total).await?;

        self.chat.upsert_threads(upload_id, &threads).await?;
        self.chat.upsert_contacts(upload_id, &contacts).await?;
        self.chat.upsert_calls(upload_id, &calls).await?;

        let mut processed = 0i64;
        for chunk in messages.chunks(ChatLoader::MESSAGE_BATCH) {
            self.chat.upsert_messages(upload_id, chunk).await?;
            processed += chunk.len() as i64;
            self.jobs
                .set_processed(upload_id, CHAT_PASS_LABEL, processed)
                .await?;
        }
        self.jobs
            .mark_completed(upload_id, CHAT_PASS_LABEL, total, processed)
            .await?;

        tracing::info!(
            messages = messages.len(),
            threads = threads.len(),
            contacts = contacts.len(),
            calls = calls.len(),
            "chat databases loaded"
        );
        Ok(())
    }
}
