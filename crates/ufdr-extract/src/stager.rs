//! Archive staging: stream the object out of the store, detect the
//! package layout, and pull the evidence tree and chat databases into
//! scratch space.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use futures::StreamExt;
use tempfile::TempDir;
use ufdr_core::AppError;
use ufdr_storage::MultipartStore;
use zip::ZipArchive;

/// Database base-name patterns for embedded chat databases, including
/// rotated backup copies (`msgstore-2023-11-01.1.db` and friends).
const CHAT_DB_PATTERNS: &[&str] = &["msgstore.db", "msgstore-", "wa.db"];

const REPORT_NAME: &str = "report.xml";
const DATABASE_SUBTREE: &str = "files/Database/";

/// A staged archive. The scratch directory and everything in it is
/// removed when this is dropped, on every exit path.
pub struct StagedArchive {
    scratch: TempDir,
    /// Path of the downloaded archive inside scratch.
    pub archive_path: PathBuf,
    /// Present only for forensic packages.
    pub report_path: Option<PathBuf>,
    /// Extracted chat databases, all backup copies included.
    pub chat_db_paths: Vec<PathBuf>,
    /// Whether the zip had both the evidence tree and a database subtree.
    pub is_forensic_package: bool,
}

impl StagedArchive {
    pub fn scratch_path(&self) -> &Path {
        self.scratch.path()
    }
}

/// Stages archives from an object store into scratch space.
pub struct Stager<'a> {
    store: &'a dyn MultipartStore,
}

impl<'a> Stager<'a> {
    pub fn new(store: &'a dyn MultipartStore) -> Self {
        Self { store }
    }

    /// Download `key` and stage its contents.
    ///
    /// The object is streamed to disk in bounded chunks; the archive is
    /// never held in memory. Non-zip objects and plain zips stage
    /// without an evidence tree or databases, and the domain passes
    /// then fail with format errors instead of the stager guessing.
    #[tracing::instrument(skip(self))]
    pub async fn stage(&self, key: &str) -> Result<StagedArchive, AppError> {
        let scratch = TempDir::with_prefix("ufdr_ingest_")
            .map_err(|e| AppError::Internal(format!("scratch dir: {e}")))?;
        let archive_path = scratch.path().join("archive");

        self.download_to(key, &archive_path).await?;

        let scratch_dir = scratch.path().to_path_buf();
        let archive = archive_path.clone();
        let staged = tokio::task::spawn_blocking(move || stage_blocking(&archive, &scratch_dir))
            .await
            .map_err(|e| AppError::Internal(format!("staging task: {e}")))?;

        match staged {
            Ok((report_path, chat_db_paths, is_forensic_package)) => {
                tracing::info!(
                    key = %key,
                    forensic = is_forensic_package,
                    chat_dbs = chat_db_paths.len(),
                    "archive staged"
                );
                Ok(StagedArchive {
                    scratch,
                    archive_path,
                    report_path,
                    chat_db_paths,
                    is_forensic_package,
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn download_to(&self, key: &str, dest: &Path) -> Result<(), AppError> {
        let mut stream = self
            .store
            .download_stream(key)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        let file = File::create(dest).map_err(|e| AppError::Internal(format!("scratch file: {e}")))?;
        let mut writer = BufWriter::new(file);
        let mut total: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| AppError::Storage(e.to_string()))?;
            total += bytes.len() as u64;
            writer
                .write_all(&bytes)
                .map_err(|e| AppError::Internal(format!("scratch write: {e}")))?;
        }
        writer
            .flush()
            .map_err(|e| AppError::Internal(format!("scratch write: {e}")))?;

        tracing::debug!(key = %key, size_bytes = total, "archive downloaded to scratch");
        Ok(())
    }
}

type StagedPaths = (Option<PathBuf>, Vec<PathBuf>, bool);

fn stage_blocking(archive_path: &Path, scratch: &Path) -> Result<StagedPaths, AppError> {
    let file = File::open(archive_path)
        .map_err(|e| AppError::Internal(format!("open staged archive: {e}")))?;
    let mut zip = match ZipArchive::new(file) {
        Ok(zip) => zip,
        Err(e) => {
            // Not a zip at all; stage with nothing extracted.
            tracing::warn!(error = %e, "archive is not a readable zip");
            return Ok((None, Vec::new(), false));
        }
    };

    let names: Vec<String> = zip.file_names().map(str::to_string).collect();
    let has_report = names.iter().any(|n| n.ends_with(REPORT_NAME));
    let has_databases = names.iter().any(|n| n.contains(DATABASE_SUBTREE));
    let is_forensic_package = has_report && has_databases;

    let mut report_path = None;
    let mut chat_db_paths = Vec::new();

    for name in &names {
        if name.ends_with(REPORT_NAME) && report_path.is_none() {
            report_path = Some(extract_entry(&mut zip, name, scratch, "report.xml")?);
        } else if name.contains(DATABASE_SUBTREE) && is_chat_db(name) {
            let base = base_name(name);
            let dest_name = format!("db_{}_{}", chat_db_paths.len(), base);
            chat_db_paths.push(extract_entry(&mut zip, name, scratch, &dest_name)?);
        }
    }

    Ok((report_path, chat_db_paths, is_forensic_package))
}

fn is_chat_db(entry_name: &str) -> bool {
    let base = base_name(entry_name);
    CHAT_DB_PATTERNS.iter().any(|p| base.contains(p))
}

fn base_name(entry_name: &str) -> &str {
    entry_name.rsplit('/').next().unwrap_or(entry_name)
}

fn extract_entry(
    zip: &mut ZipArchive<File>,
    entry_name: &str,
    scratch: &Path,
    dest_name: &str,
) -> Result<PathBuf, AppError> {
    let mut entry = zip
        .by_name(entry_name)
        .map_err(|e| AppError::Format(format!("archive entry {entry_name}: {e}")))?;
    let dest = scratch.join(dest_name);
    let mut out = File::create(&dest)
        .map_err(|e| AppError::Internal(format!("scratch file {dest_name}: {e}")))?;
    std::io::copy(&mut entry, &mut out)
        .map_err(|e| AppError::Format(format!("extract {entry_name}: {e}")))?;
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use ufdr_storage::InMemoryStore;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = ZipWriter::new(&mut cursor);
            for (name, data) in entries {
                writer.start_file(*name, FileOptions::default()).unwrap();
                writer.write_all(data).unwrap();
            }
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    #[tokio::test]
    async fn forensic_package_detected_and_extracted() {
        let store = InMemoryStore::new();
        let data = build_zip(&[
            ("report.xml", b"<project/>"),
            ("files/Database/msgstore.db", b"sqlite-bytes"),
            ("files/Database/msgstore-2023-11-01.1.db", b"backup-bytes"),
            ("files/Database/wa.db", b"wa-bytes"),
            ("files/Database/unrelated.txt", b"noise"),
            ("files/Images/photo.jpg", b"jpeg"),
        ]);
        store.put_object("uploads/u1/case.ufdr", data);

        let stager = Stager::new(&store);
        let staged = stager.stage("uploads/u1/case.ufdr").await.unwrap();
        assert!(staged.is_forensic_package);
        assert!(staged.report_path.is_some());
        assert_eq!(staged.chat_db_paths.len(), 3);
        for p in &staged.chat_db_paths {
            assert!(p.exists());
        }
    }

    #[tokio::test]
    async fn plain_zip_is_not_a_forensic_package() {
        let store = InMemoryStore::new();
        let data = build_zip(&[("readme.txt", b"hello")]);
        store.put_object("uploads/u2/plain.zip", data);

        let staged = Stager::new(&store).stage("uploads/u2/plain.zip").await.unwrap();
        assert!(!staged.is_forensic_package);
        assert!(staged.report_path.is_none());
        assert!(staged.chat_db_paths.is_empty());
    }

    #[tokio::test]
    async fn non_zip_object_stages_without_contents() {
        let store = InMemoryStore::new();
        store.put_object("uploads/u3/notazip.bin", &b"random bytes, no zip magic"[..]);

        let staged = Stager::new(&store).stage("uploads/u3/notazip.bin").await.unwrap();
        assert!(!staged.is_forensic_package);
        assert!(staged.chat_db_paths.is_empty());
    }

    #[tokio::test]
    async fn missing_object_is_a_storage_error() {
        let store = InMemoryStore::new();
        let result = Stager::new(&store).stage("uploads/nope/gone").await;
        assert!(matches!(result, Err(AppError::Storage(_))));
    }

    #[tokio::test]
    async fn scratch_is_removed_on_drop() {
        let store = InMemoryStore::new();
        store.put_object("k", build_zip(&[("report.xml", b"<x/>")]));
        let staged = Stager::new(&store).stage("k").await.unwrap();
        let scratch = staged.scratch_path().to_path_buf();
        assert!(scratch.exists());
        drop(staged);
        assert!(!scratch.exists());
    }
}
