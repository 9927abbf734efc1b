//! Error types module
//!
//! All errors in the ingest path are unified under the `AppError` enum.
//! The taxonomy distinguishes capacity errors (rejected before any store
//! call), object-store errors, archive format errors, record-level parse
//! errors, and load errors so callers can decide what is fatal and what
//! is isolated to one extraction domain.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected errors such as validation failures
    Debug,
    /// Recoverable issues
    Warn,
    /// Unexpected failures
    Error,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Declared size exceeds what the part-count ceiling can address.
    #[error("capacity exceeded: {0}")]
    Capacity(String),

    #[error("object store error: {0}")]
    Storage(String),

    /// Archive is missing an expected component (evidence tree, databases).
    #[error("archive format error: {0}")]
    Format(String),

    /// A malformed record or value. Skipped at record granularity by the
    /// extractors; only surfaces when a whole document is unreadable.
    #[error("parse error: {0}")]
    Parse(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("queue error: {0}")]
    Queue(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound("row not found".to_string()),
            other => AppError::Database(other.to_string()),
        }
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        AppError::Database(e.to_string())
    }
}

impl AppError {
    /// HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            AppError::Capacity(_) | AppError::InvalidInput(_) => 400,
            AppError::NotFound(_) => 404,
            AppError::Format(_) | AppError::Parse(_) => 422,
            AppError::Storage(_)
            | AppError::Database(_)
            | AppError::Queue(_)
            | AppError::Internal(_) => 500,
        }
    }

    /// Machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Capacity(_) => "CAPACITY_EXCEEDED",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::Format(_) => "ARCHIVE_FORMAT_ERROR",
            AppError::Parse(_) => "PARSE_ERROR",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Queue(_) => "QUEUE_ERROR",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the operation can be retried as-is.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Storage(_) | AppError::Database(_) | AppError::Queue(_)
        )
    }

    pub fn log_level(&self) -> LogLevel {
        match self {
            AppError::Capacity(_) | AppError::InvalidInput(_) | AppError::NotFound(_) => {
                LogLevel::Debug
            }
            AppError::Format(_) | AppError::Parse(_) | AppError::Queue(_) => LogLevel::Warn,
            AppError::Storage(_) | AppError::Database(_) | AppError::Internal(_) => LogLevel::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_errors_are_client_errors() {
        let err = AppError::Capacity("needs 12000 parts (limit 10000)".into());
        assert_eq!(err.http_status_code(), 400);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn missing_upload_maps_to_not_found() {
        let err = AppError::NotFound("upload 123".into());
        assert_eq!(err.http_status_code(), 404);
        assert_eq!(err.error_code(), "NOT_FOUND");
    }

    #[test]
    fn store_errors_are_retryable_server_errors() {
        let err = AppError::Storage("complete_multipart_upload failed".into());
        assert_eq!(err.http_status_code(), 500);
        assert!(err.is_recoverable());
    }
}
