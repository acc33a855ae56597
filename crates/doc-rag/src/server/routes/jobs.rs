//! Background job status endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::error::Result;
use crate::processing::UploadJob;
use crate::server::state::AppState;

/// Job listing
#[derive(Debug, Serialize)]
pub struct JobList {
    pub total: usize,
    pub jobs: Vec<UploadJob>,
}

/// GET /status/{job_id} - Current state of a background upload
pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<UploadJob>> {
    Ok(Json(state.jobs().get(&job_id)?))
}

/// GET /jobs - All tracked jobs, oldest first
pub async fn list_jobs(State(state): State<AppState>) -> Json<JobList> {
    let jobs = state.jobs().list();
    Json(JobList {
        total: jobs.len(),
        jobs,
    })
}
