//! In-memory status table for background uploads

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Job status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Completed or failed
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Processing)
    }
}

/// Tracked background upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadJob {
    pub job_id: String,
    pub filename: String,
    pub status: JobStatus,
    /// 0 to 100, never decreasing
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size_mb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<usize>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// When the job reached a terminal state
    #[serde(skip)]
    pub finished_at: Option<DateTime<Utc>>,
}

impl UploadJob {
    fn new(filename: &str) -> Self {
        let now = Utc::now();
        Self {
            job_id: Uuid::new_v4().to_string(),
            filename: filename.to_string(),
            status: JobStatus::Processing,
            progress: 0,
            error: None,
            file_size_mb: None,
            documents: None,
            created_at: now,
            updated_at: now,
            finished_at: None,
        }
    }

    fn finish(&mut self, status: JobStatus) {
        let now = Utc::now();
        self.status = status;
        self.updated_at = now;
        self.finished_at = Some(now);
    }
}

/// Job table keyed by job id
pub struct JobStore {
    jobs: DashMap<String, UploadJob>,
    ttl: chrono::Duration,
}

impl JobStore {
    /// Create a store whose finished jobs expire after `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self {
            jobs: DashMap::new(),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
        }
    }

    /// Register a new job at `Processing(0)`
    pub fn create(&self, filename: &str) -> UploadJob {
        let job = UploadJob::new(filename);
        tracing::info!("Job {} created for {}", job.job_id, filename);
        self.jobs.insert(job.job_id.clone(), job.clone());
        job
    }

    /// Snapshot of a job
    pub fn get(&self, job_id: &str) -> Result<UploadJob> {
        self.jobs
            .get(job_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::JobNotFound(job_id.to_string()))
    }

    /// All jobs, oldest first
    pub fn list(&self) -> Vec<UploadJob> {
        let mut jobs: Vec<UploadJob> = self.jobs.iter().map(|e| e.value().clone()).collect();
        jobs.sort_by_key(|j| j.created_at);
        jobs
    }

    /// Raise progress; returns false when the update was ignored
    pub fn set_progress(&self, job_id: &str, progress: u8) -> bool {
        let Some(mut job) = self.jobs.get_mut(job_id) else {
            return false;
        };
        let progress = progress.min(100);
        if job.status.is_terminal() || progress <= job.progress {
            return false;
        }
        job.progress = progress;
        job.updated_at = Utc::now();
        tracing::debug!("Job {} at {}%", job_id, progress);
        true
    }

    /// Mark a job completed with its result metadata
    pub fn complete(&self, job_id: &str, file_size_mb: f64, documents: usize) {
        if let Some(mut job) = self.jobs.get_mut(job_id) {
            if job.status.is_terminal() {
                return;
            }
            job.progress = 100;
            job.file_size_mb = Some(file_size_mb);
            job.documents = Some(documents);
            job.finish(JobStatus::Completed);
            tracing::info!("Job {} completed ({} documents)", job_id, documents);
        }
    }

    /// Mark a job failed, keeping its last progress
    pub fn fail(&self, job_id: &str, error: impl Into<String>) {
        if let Some(mut job) = self.jobs.get_mut(job_id) {
            if job.status.is_terminal() {
                return;
            }
            let error = error.into();
            tracing::error!("Job {} failed: {}", job_id, error);
            job.error = Some(error);
            job.finish(JobStatus::Failed);
        }
    }

    /// Remove finished jobs older than the TTL
    pub fn evict_expired(&self) -> usize {
        match Utc::now().checked_sub_signed(self.ttl) {
            Some(cutoff) => self.evict_finished_before(cutoff),
            None => 0,
        }
    }

    fn evict_finished_before(&self, cutoff: DateTime<Utc>) -> usize {
        let before = self.jobs.len();
        self.jobs
            .retain(|_, job| !matches!(job.finished_at, Some(done) if done <= cutoff));
        let evicted = before.saturating_sub(self.jobs.len());
        if evicted > 0 {
            tracing::info!("Evicted {} expired jobs", evicted);
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
