//! Loader selection by document kind

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::config::DispatchConfig;
use crate::error::{Error, Result};
use crate::types::{DocumentRecord, Kind};

use super::loaders::LoaderRegistry;

/// Runs the configured loader for a kind
#[derive(Clone)]
pub struct IngestionDispatcher {
    loaders: Arc<LoaderRegistry>,
    dispatch: Arc<DispatchConfig>,
}

impl IngestionDispatcher {
    pub fn new(loaders: Arc<LoaderRegistry>, dispatch: Arc<DispatchConfig>) -> Self {
        Self { loaders, dispatch }
    }

    /// Load `path` as `kind`, returning the loader's records unmodified
    pub async fn ingest(&self, path: &Path, kind: Kind) -> Result<Vec<DocumentRecord>> {
        let profile = self.dispatch.profile(kind)?;
        let loader = self.loaders.get(&profile.loader).ok_or_else(|| {
            Error::Config(format!(
                "Loader '{}' for kind '{}' is not registered",
                profile.loader, kind
            ))
        })?;

        tracing::info!(
            "Loading {} as {} with '{}' loader",
            path.display(),
            kind,
            loader.name()
        );

        let start = Instant::now();
        let owned: PathBuf = path.to_path_buf();
        let records = tokio::task::spawn_blocking(move || loader.load(&owned))
            .await
            .map_err(|e| Error::ingestion(path, format!("loader task failed: {}", e)))?
            .map_err(|e| match e {
                Error::Ingestion { .. } => e,
                other => Error::ingestion(path, other.to_string()),
            })?;

        tracing::info!(
            "Loaded {} document records from {} in {:.2}s",
            records.len(),
            path.display(),
            start.elapsed().as_secs_f64()
        );

        Ok(records)
    }
}
