//! Route configuration and setup

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::uploads;
use crate::state::AppState;

/// Request bodies are JSON control messages; archive bytes go straight
/// to the store via presigned URLs and never pass through this server.
const MAX_BODY_BYTES: usize = 1024 * 1024;

pub fn setup_routes(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/uploads/init", post(uploads::init_upload))
        .route("/uploads/{id}/complete", put(uploads::complete_upload))
        .route("/uploads/{id}/status", get(uploads::upload_status))
        .route(
            "/uploads/{id}/extraction-status",
            get(uploads::extraction_status),
        )
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}
