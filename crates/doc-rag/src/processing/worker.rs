//! Upload processing shared by the synchronous and background paths

use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::ingestion::TempUpload;
use crate::server::state::AppState;
use crate::session::Session;
use crate::types::Kind;

use super::jobs::JobStore;

/// Progress checkpoints reported while an upload is processed
pub mod checkpoint {
    pub const INGESTING: u8 = 25;
    pub const TRANSFORMING: u8 = 50;
    pub const INDEXED: u8 = 90;
}

/// What a successful upload produced
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub kind: Kind,
    pub documents: usize,
    pub chunks: usize,
}

/// Resolve, ingest and index an upload, then publish it as the active session
///
/// `progress` is called with each checkpoint. The temp file is left in place;
/// it goes away when the caller drops or discards `upload`.
pub async fn run_pipeline<F>(
    state: &AppState,
    upload: &TempUpload,
    filename: &str,
    mut progress: F,
) -> Result<UploadOutcome>
where
    F: FnMut(u8),
{
    let start = Instant::now();

    let kind = state.resolver().resolve_supported(upload.path())?;
    tracing::info!("Resolved {} as {}", filename, kind.display_name());

    progress(checkpoint::INGESTING);
    let documents = state.dispatcher().ingest(upload.path(), kind).await?;
    let documents_count = documents.len();

    progress(checkpoint::TRANSFORMING);
    let index = state.pipeline().transform(documents, kind).await?;
    let chunks = index.len();

    state.sessions().replace(Session {
        index,
        source_path: upload.path().to_path_buf(),
        filename: filename.to_string(),
        kind,
        documents_count,
        chunks_indexed: chunks,
        loaded_at: Utc::now(),
    });
    progress(checkpoint::INDEXED);

    tracing::info!(
        "Processed {} in {:.2}s: {} documents, {} chunks indexed",
        filename,
        start.elapsed().as_secs_f64(),
        documents_count,
        chunks
    );

    Ok(UploadOutcome {
        kind,
        documents: documents_count,
        chunks,
    })
}

/// Process an accepted upload in the background, recording the outcome in the job table
///
/// Runs the pipeline in its own task so a panic still ends in `Failed`.
pub async fn process_upload_background(
    state: AppState,
    job_id: String,
    upload: TempUpload,
    filename: String,
) {
    let jobs = state.jobs().clone();
    let size_mb = upload.size_mb();

    let task = {
        let jobs = jobs.clone();
        let job_id = job_id.clone();
        tokio::spawn(async move {
            let result = run_pipeline(&state, &upload, &filename, |p| {
                jobs.set_progress(&job_id, p);
            })
            .await;
            upload.discard();
            result
        })
    };

    let result = match task.await {
        Ok(result) => result,
        Err(e) => Err(Error::internal(format!("processing task aborted: {}", e))),
    };

    match result {
        Ok(outcome) => jobs.complete(&job_id, size_mb, outcome.documents),
        Err(e) => jobs.fail(&job_id, e.to_string()),
    }
}

/// Periodically drop expired jobs
pub async fn run_job_sweeper(jobs: Arc<JobStore>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        jobs.evict_expired();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RagConfig;
    use crate::ingestion::{save_stream, DocumentLoader, LoaderRegistry};
    use crate::processing::JobStatus;
    use crate::providers::{EmbeddingProvider, LlmProvider, VectorStoreRegistry};
    use crate::types::DocumentRecord;
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures_util::stream;
    use std::path::Path;
    use tempfile::TempDir;

    struct LengthEmbedder;

    #[async_trait]
    impl EmbeddingProvider for LengthEmbedder {
        async fn embed(&self, _model: &str, text: &str) -> Result<Vec<f32>> {
            Ok(vec![text.len() as f32, 1.0])
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "length"
        }
    }

    struct SilentLlm;

    #[async_trait]
    impl LlmProvider for SilentLlm {
        async fn generate(&self, _model: &str, _prompt: &str) -> Result<String> {
            Ok(String::new())
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "silent"
        }
    }

    struct UnreadableLoader;

    impl DocumentLoader for UnreadableLoader {
        fn load(&self, path: &Path) -> Result<Vec<DocumentRecord>> {
            Err(Error::ingestion(path, "corrupt file"))
        }

        fn name(&self) -> &str {
            "unreadable"
        }
    }

    fn state(loaders: LoaderRegistry) -> (AppState, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RagConfig::default();
        config.server.temp_dir = dir.path().to_path_buf();
        let state = AppState::with_components(
            config,
            loaders,
            VectorStoreRegistry::with_defaults(),
            Arc::new(LengthEmbedder),
            Arc::new(SilentLlm),
        )
        .ok()
        .unwrap();
        (state, dir)
    }

    async fn upload(dir: &TempDir, text: &str) -> TempUpload {
        let parts = stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from(text.to_string()))]);
        save_stream(parts, &dir.path().join("notes.txt"), 1024 * 1024, 1024)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_successful_run_reports_every_checkpoint() {
        let (state, dir) = state(LoaderRegistry::with_defaults());
        let upload = upload(&dir, &"plain words to index. ".repeat(50)).await;

        let mut seen = Vec::new();
        let outcome = run_pipeline(&state, &upload, "notes.txt", |p| seen.push(p))
            .await
            .unwrap();

        assert_eq!(
            seen,
            vec![
                checkpoint::INGESTING,
                checkpoint::TRANSFORMING,
                checkpoint::INDEXED
            ]
        );
        assert_eq!(seen, vec![25, 50, 90]);
        assert_eq!(outcome.kind, Kind::PlainText);
        assert_eq!(outcome.documents, 1);

        let session = state.sessions().current().unwrap();
        assert_eq!(session.filename, "notes.txt");
        assert_eq!(session.chunks_indexed, outcome.chunks);
        assert_eq!(session.source_path, upload.path());
    }

    #[tokio::test]
    async fn test_failed_ingestion_stops_after_first_checkpoint() {
        let mut loaders = LoaderRegistry::with_defaults();
        loaders.register("text", Arc::new(UnreadableLoader));
        let (state, dir) = state(loaders);
        let upload = upload(&dir, "some text").await;

        let mut seen = Vec::new();
        let err = run_pipeline(&state, &upload, "notes.txt", |p| seen.push(p))
            .await
            .err()
            .unwrap();

        assert!(matches!(err, Error::Ingestion { .. }));
        assert_eq!(seen, vec![checkpoint::INGESTING]);
        assert!(!state.sessions().is_loaded());
    }

    #[tokio::test]
    async fn test_background_run_completes_job_and_removes_file() {
        let (state, dir) = state(LoaderRegistry::with_defaults());
        let upload = upload(&dir, &"background words. ".repeat(40)).await;
        let path = upload.path().to_path_buf();
        let job = state.jobs().create("notes.txt");

        process_upload_background(state.clone(), job.job_id.clone(), upload, "notes.txt".to_string())
            .await;

        let job = state.jobs().get(&job.job_id).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert_eq!(job.documents, Some(1));
        assert!(!path.exists());
    }
}
