//! HTTP routes

pub mod jobs;
pub mod query;
pub mod upload;

use axum::{
    extract::{DefaultBodyLimit, State},
    response::Html,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::server::state::AppState;

const UPLOAD_FORM: &str = include_str!("../ui.html");

/// Build all routes
///
/// Upload routes carry no body limit; the streaming size check enforces
/// `max_upload_size` and answers 413 itself.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(health))
        .route("/ui", get(upload_form))
        .route(
            "/upload",
            post(upload::upload_file).layer(DefaultBodyLimit::disable()),
        )
        .route(
            "/upload-background",
            post(upload::upload_background).layer(DefaultBodyLimit::disable()),
        )
        .route("/status/:job_id", get(jobs::job_status))
        .route("/jobs", get(jobs::list_jobs))
        .route("/query/invoke", post(query::query_invoke))
}

/// GET / - Health and limits
async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let max = state.config().server.max_upload_size as f64;
    let session = state.sessions().current();
    Json(json!({
        "status": "running",
        "max_file_size_mb": max / (1024.0 * 1024.0),
        "max_file_size_gb": max / (1024.0 * 1024.0 * 1024.0),
        "index_loaded": session.is_some(),
        "loaded_file": session.as_ref().map(|s| s.filename.clone()),
    }))
}

/// GET /ui - Browser form for uploading and asking questions
async fn upload_form() -> Html<&'static str> {
    Html(UPLOAD_FORM)
}
