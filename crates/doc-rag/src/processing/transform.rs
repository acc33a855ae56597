//! Records to queryable index: split, cap, embed, build

use std::sync::Arc;
use std::time::Instant;

use crate::config::DispatchConfig;
use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, VectorIndex, VectorStoreRegistry};
use crate::types::{DocumentRecord, Kind};

use super::splitter::TextSplitter;

/// Builds a `VectorIndex` for the records of one upload
#[derive(Clone)]
pub struct TransformationPipeline {
    splitter: Arc<dyn TextSplitter>,
    dispatch: Arc<DispatchConfig>,
    stores: Arc<VectorStoreRegistry>,
    embedder: Arc<dyn EmbeddingProvider>,
    embed_cap: Option<usize>,
}

impl TransformationPipeline {
    pub fn new(
        splitter: Arc<dyn TextSplitter>,
        dispatch: Arc<DispatchConfig>,
        stores: Arc<VectorStoreRegistry>,
        embedder: Arc<dyn EmbeddingProvider>,
        embed_cap: Option<usize>,
    ) -> Self {
        Self {
            splitter,
            dispatch,
            stores,
            embedder,
            embed_cap,
        }
    }

    /// Split, cap and index `documents` using the profile for `kind`
    ///
    /// Nothing is published on failure; the caller decides where the index goes.
    pub async fn transform(
        &self,
        documents: Vec<DocumentRecord>,
        kind: Kind,
    ) -> Result<Arc<dyn VectorIndex>> {
        let start = Instant::now();
        let label = documents
            .first()
            .map(|d| d.source.display().to_string())
            .unwrap_or_else(|| "empty document set".to_string());

        // One past the cap tells us whether anything was dropped
        let limit = self.embed_cap.map(|cap| cap.saturating_add(1));
        let splitter = self.splitter.clone();
        let mut chunks = tokio::task::spawn_blocking(move || splitter.split(&documents, limit))
            .await
            .map_err(|e| Error::internal(format!("Splitter task failed: {}", e)))?;

        if chunks.is_empty() {
            return Err(Error::EmptyDocument(label));
        }

        let profile = self.dispatch.profile(kind)?;
        let backend = self.stores.get(&profile.vector_store).ok_or_else(|| {
            Error::Config(format!(
                "Vector store '{}' for kind '{}' is not registered",
                profile.vector_store, kind
            ))
        })?;

        if let Some(cap) = self.embed_cap {
            if chunks.len() > cap {
                tracing::warn!(
                    "{} has more than {} chunks; embedding only the first {}",
                    label,
                    cap,
                    cap
                );
                chunks.truncate(cap);
            }
        }

        let first = chunks.first().map(|c| c.source_ref()).unwrap_or_default();
        tracing::info!(
            "Indexing {} chunks starting at {} with '{}' into {}",
            chunks.len(),
            first,
            profile.embedding_model,
            backend.name()
        );

        let index = backend
            .build(chunks, self.embedder.clone(), &profile.embedding_model)
            .await
            .map_err(|e| match e {
                Error::Transformation(_) | Error::Config(_) => e,
                other => Error::Transformation(other.to_string()),
            })?;

        tracing::info!(
            "Built {} index with {} chunks in {:.2}s",
            index.backend(),
            index.len(),
            start.elapsed().as_secs_f64()
        );

        Ok(index)
    }
}
