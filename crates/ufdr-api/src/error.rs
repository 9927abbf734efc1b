//! HTTP error response conversion.
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`; `AppError`
//! and `StorageError` convert into it so every failure renders with the
//! same status mapping, JSON shape, and logging.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use ufdr_core::{AppError, LogLevel};
use ufdr_storage::StorageError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether the request can be retried as-is
    pub recoverable: bool,
}

/// Wrapper for AppError to implement IntoResponse; orphan rules keep us
/// from implementing the axum trait on the ufdr-core type directly.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        let app = match err {
            StorageError::NotFound(msg) => AppError::NotFound(msg),
            StorageError::ConfigError(msg) => AppError::Internal(msg),
            StorageError::IoError(e) => AppError::Internal(format!("io error: {e}")),
            other => AppError::Storage(other.to_string()),
        };
        HttpAppError(app)
    }
}

fn log_error(error: &AppError) {
    match error.log_level() {
        LogLevel::Debug => tracing::debug!(error = %error, "request failed"),
        LogLevel::Warn => tracing::warn!(error = %error, "request failed"),
        LogLevel::Error => tracing::error!(error = %error, "request failed"),
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;
        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        let body = Json(ErrorResponse {
            error: app_error.to_string(),
            code: app_error.error_code().to_string(),
            recoverable: app_error.is_recoverable(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_not_found_maps_to_404() {
        let HttpAppError(app) = StorageError::NotFound("missing object".to_string()).into();
        assert!(matches!(app, AppError::NotFound(_)));
        assert_eq!(app.http_status_code(), 404);
    }

    #[test]
    fn presign_failure_maps_to_storage_error() {
        let HttpAppError(app) = StorageError::PresignFailed {
            part_number: 3,
            message: "signing failed".to_string(),
        }
        .into();
        assert!(matches!(app, AppError::Storage(_)));
        assert_eq!(app.http_status_code(), 500);
    }

    #[test]
    fn error_response_shape() {
        let response = ErrorResponse {
            error: "capacity exceeded: too many parts".to_string(),
            code: "CAPACITY_EXCEEDED".to_string(),
            recoverable: false,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json.get("code").and_then(|v| v.as_str()),
            Some("CAPACITY_EXCEEDED")
        );
        assert_eq!(json.get("recoverable").and_then(|v| v.as_bool()), Some(false));
    }
}
