//! Vector store traits: backends build indexes, indexes answer similarity queries

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::VectorIndexConfig;
use crate::error::Result;
use crate::types::Chunk;

use super::embedding::EmbeddingProvider;
use super::hnsw::{DistanceMetric, HnswBackend};

/// Search result from a vector index
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// The matched chunk
    pub chunk: Chunk,
    /// Higher is more similar; scale depends on the backend metric
    pub score: f32,
}

/// Queryable index over embedded chunks
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Top-k chunks most similar to `query`, best first
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>>;

    /// Number of indexed chunks
    fn len(&self) -> usize;

    /// Check if index is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Backend that built this index
    fn backend(&self) -> &str;
}

/// Builds a `VectorIndex` from chunks using a chosen embedding model
#[async_trait]
pub trait VectorStoreBackend: Send + Sync {
    /// Embed `chunks` with `model` and index them
    async fn build(
        &self,
        chunks: Vec<Chunk>,
        embedder: Arc<dyn EmbeddingProvider>,
        model: &str,
    ) -> Result<Arc<dyn VectorIndex>>;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Backend lookup by configured name
#[derive(Clone, Default)]
pub struct VectorStoreRegistry {
    backends: HashMap<String, Arc<dyn VectorStoreBackend>>,
}

impl VectorStoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `hnsw-cosine` and `hnsw-euclidean` using default graph parameters
    pub fn with_defaults() -> Self {
        Self::with_hnsw(&VectorIndexConfig::default())
    }

    /// Registry with both HNSW backends built from `config`
    pub fn with_hnsw(config: &VectorIndexConfig) -> Self {
        let mut registry = Self::new();
        for metric in [DistanceMetric::Cosine, DistanceMetric::Euclidean] {
            registry.register(
                metric.backend_name(),
                Arc::new(HnswBackend::new(metric, config.clone())),
            );
        }
        registry
    }

    /// Add or replace a backend
    pub fn register(&mut self, name: impl Into<String>, backend: Arc<dyn VectorStoreBackend>) {
        self.backends.insert(name.into(), backend);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn VectorStoreBackend>> {
        self.backends.get(name).cloned()
    }

    /// Registered names
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.backends.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
