//! Synchronous and background file upload endpoints

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::path::Path;

use crate::error::{Error, Result};
use crate::ingestion::{save_stream, temp_path, TempUpload};
use crate::processing::{process_upload_background, run_pipeline};
use crate::server::state::AppState;

/// Response from a synchronous upload
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub status: &'static str,
    pub message: String,
    pub file_size_mb: f64,
    pub documents_count: usize,
    pub filename: String,
}

/// Response from a background upload
#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub status: &'static str,
    pub job_id: String,
    pub message: String,
    pub check_status_url: String,
}

/// POST /upload - Stream, ingest and index a file before responding
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let (upload, filename) = receive_file(&state, &mut multipart).await?;

    let file_size_mb = upload.size_mb();
    let result = run_pipeline(&state, &upload, &filename, |_| {}).await;
    upload.discard();
    let outcome = result?;

    Ok(Json(UploadResponse {
        status: "success",
        message: "File uploaded and processed successfully".to_string(),
        file_size_mb,
        documents_count: outcome.documents,
        filename,
    }))
}

/// POST /upload-background - Stream the file, then process it as a tracked job
pub async fn upload_background(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<AcceptedResponse>)> {
    let (upload, filename) = receive_file(&state, &mut multipart).await?;

    let job = state.jobs().create(&filename);
    tokio::spawn(process_upload_background(
        state.clone(),
        job.job_id.clone(),
        upload,
        filename,
    ));

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            status: "accepted",
            check_status_url: format!("/status/{}", job.job_id),
            job_id: job.job_id,
            message: "File uploaded. Processing in background.".to_string(),
        }),
    ))
}

/// Stream the first file part to temp storage
async fn receive_file(state: &AppState, multipart: &mut Multipart) -> Result<(TempUpload, String)> {
    let server = &state.config().server;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::BadRequest(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() != Some("file") && field.file_name().is_none() {
            continue;
        }

        let filename = field
            .file_name()
            .and_then(|name| Path::new(name).file_name())
            .map(|name| name.to_string_lossy().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "upload".to_string());

        tracing::info!("Starting upload: {}", filename);
        let dest = temp_path(&server.temp_dir, &filename);
        let upload = save_stream(field, &dest, server.max_upload_size, server.upload_chunk_size).await?;

        return Ok((upload, filename));
    }

    Err(Error::BadRequest("No file part in multipart body".to_string()))
}
