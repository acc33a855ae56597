//! In-process HNSW vector indexes built with `hnsw_rs`

use async_trait::async_trait;
use hnsw_rs::prelude::*;
use std::sync::Arc;

use crate::config::VectorIndexConfig;
use crate::error::{Error, Result};
use crate::types::Chunk;

use super::embedding::EmbeddingProvider;
use super::vector_store::{ScoredChunk, VectorIndex, VectorStoreBackend};

/// hnsw_rs supports at most 16 layers
const MAX_LAYERS: usize = 16;

/// Distance used by the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMetric {
    /// Cosine distance; scores are cosine similarity
    Cosine,
    /// L2 distance; scores are the negated distance
    Euclidean,
}

impl DistanceMetric {
    /// Higher-is-better score for a graph distance
    fn score(&self, distance: f32) -> f32 {
        match self {
            DistanceMetric::Cosine => 1.0 - distance,
            DistanceMetric::Euclidean => -distance,
        }
    }

    /// Registry name of the backend using this metric
    pub fn backend_name(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "hnsw-cosine",
            DistanceMetric::Euclidean => "hnsw-euclidean",
        }
    }
}

enum Graph {
    Cosine(Hnsw<'static, f32, DistCosine>),
    Euclidean(Hnsw<'static, f32, DistL2>),
}

#[allow(clippy::ptr_arg)]
impl Graph {
    fn new(metric: DistanceMetric, config: &VectorIndexConfig, elements: usize) -> Self {
        let layers = ((elements as f32).ln().ceil() as usize).clamp(1, MAX_LAYERS);
        let m = config.hnsw_m;
        let ef = config.hnsw_ef_construction;
        match metric {
            DistanceMetric::Cosine => {
                Graph::Cosine(Hnsw::new(m, elements, layers, ef, DistCosine {}))
            }
            DistanceMetric::Euclidean => {
                Graph::Euclidean(Hnsw::new(m, elements, layers, ef, DistL2 {}))
            }
        }
    }

    fn insert(&self, vector: &Vec<f32>, id: usize) {
        match self {
            Graph::Cosine(hnsw) => hnsw.insert((vector, id)),
            Graph::Euclidean(hnsw) => hnsw.insert((vector, id)),
        }
    }

    fn search(&self, query: &Vec<f32>, k: usize, ef_search: usize) -> Vec<Neighbour> {
        match self {
            Graph::Cosine(hnsw) => hnsw.search(query, k, ef_search),
            Graph::Euclidean(hnsw) => hnsw.search(query, k, ef_search),
        }
    }
}

/// Backend producing `HnswIndex` handles
pub struct HnswBackend {
    metric: DistanceMetric,
    config: VectorIndexConfig,
}

impl HnswBackend {
    pub fn new(metric: DistanceMetric, config: VectorIndexConfig) -> Self {
        Self { metric, config }
    }
}

#[async_trait]
impl VectorStoreBackend for HnswBackend {
    async fn build(
        &self,
        chunks: Vec<Chunk>,
        embedder: Arc<dyn EmbeddingProvider>,
        model: &str,
    ) -> Result<Arc<dyn VectorIndex>> {
        if chunks.is_empty() {
            return Err(Error::Transformation("no chunks to index".to_string()));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = embedder
            .embed_batch(model, &texts)
            .await
            .map_err(|e| Error::Transformation(format!("embedding with '{}' failed: {}", model, e)))?;

        if vectors.len() != chunks.len() {
            return Err(Error::Transformation(format!(
                "embedder returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let dimensions = vectors[0].len();
        if dimensions == 0 || vectors.iter().any(|v| v.len() != dimensions) {
            return Err(Error::Transformation(
                "embeddings have inconsistent dimensions".to_string(),
            ));
        }

        let graph = Graph::new(self.metric, &self.config, chunks.len());
        for (id, vector) in vectors.iter().enumerate() {
            graph.insert(vector, id);
        }

        tracing::debug!(
            "Indexed {} chunks ({} dims) in {}",
            chunks.len(),
            dimensions,
            self.metric.backend_name()
        );

        Ok(Arc::new(HnswIndex {
            graph,
            chunks,
            dimensions,
            metric: self.metric,
            ef_search: self.config.hnsw_ef_search,
            embedder,
            model: model.to_string(),
        }))
    }

    fn name(&self) -> &str {
        self.metric.backend_name()
    }
}

/// Embedded chunks in an HNSW graph; graph ids are positions in `chunks`
pub struct HnswIndex {
    graph: Graph,
    chunks: Vec<Chunk>,
    dimensions: usize,
    metric: DistanceMetric,
    ef_search: usize,
    embedder: Arc<dyn EmbeddingProvider>,
    model: String,
}

#[async_trait]
impl VectorIndex for HnswIndex {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        let query_vec = self.embedder.embed(&self.model, query).await?;
        if query_vec.len() != self.dimensions {
            return Err(Error::embedding(format!(
                "query embedding has {} dims, index has {}",
                query_vec.len(),
                self.dimensions
            )));
        }

        let k = k.min(self.chunks.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut hits: Vec<ScoredChunk> = self
            .graph
            .search(&query_vec, k, self.ef_search.max(k))
            .into_iter()
            .filter_map(|n| {
                self.chunks.get(n.d_id).map(|chunk| ScoredChunk {
                    chunk: chunk.clone(),
                    score: self.metric.score(n.distance),
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);

        if let Some(best) = hits.first() {
            tracing::debug!(
                "Best match for query: {} (score {:.3})",
                best.chunk.source_ref(),
                best.score
            );
        }

        Ok(hits)
    }

    fn len(&self) -> usize {
        self.chunks.len()
    }

    fn backend(&self) -> &str {
        self.metric.backend_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    /// Maps a few keywords onto fixed axes
    struct KeywordEmbedder;

    #[async_trait]
    impl EmbeddingProvider for KeywordEmbedder {
        async fn embed(&self, _model: &str, text: &str) -> Result<Vec<f32>> {
            let text = text.to_lowercase();
            Ok(vec![
                text.matches("cat").count() as f32,
                text.matches("dog").count() as f32,
                text.matches("fish").count() as f32 + 0.1,
            ])
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "keyword"
        }
    }

    struct BrokenEmbedder;

    #[async_trait]
    impl EmbeddingProvider for BrokenEmbedder {
        async fn embed(&self, _model: &str, _text: &str) -> Result<Vec<f32>> {
            Err(Error::embedding("model not pulled"))
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(false)
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    fn chunk(content: &str, index: usize) -> Chunk {
        Chunk {
            content: content.to_string(),
            record_index: 0,
            chunk_index: index,
            start: 0,
            end: content.len(),
            source: PathBuf::from("pets.txt"),
            locator: None,
        }
    }

    fn backend(metric: DistanceMetric) -> HnswBackend {
        HnswBackend::new(metric, VectorIndexConfig::default())
    }

    #[tokio::test]
    async fn test_retrieve_ranks_by_similarity() {
        for metric in [DistanceMetric::Cosine, DistanceMetric::Euclidean] {
            let index = backend(metric)
                .build(
                    vec![chunk("cat cat", 0), chunk("dog dog", 1), chunk("fish", 2)],
                    Arc::new(KeywordEmbedder),
                    "m",
                )
                .await
                .unwrap();

            assert_eq!(index.len(), 3);
            assert_eq!(index.backend(), metric.backend_name());
            let hits = index.retrieve("dog dog", 2).await.unwrap();
            assert_eq!(hits.len(), 2);
            assert_eq!(hits[0].chunk.content, "dog dog");
            assert!(hits[0].score >= hits[1].score);
        }
    }

    #[tokio::test]
    async fn test_k_larger_than_index() {
        let index = backend(DistanceMetric::Cosine)
            .build(vec![chunk("cat", 0)], Arc::new(KeywordEmbedder), "m")
            .await
            .unwrap();

        let hits = index.retrieve("cat", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!((hits[0].score - 1.0).abs() < 1e-3);
    }

    #[tokio::test]
    async fn test_embedding_failure_is_transformation_error() {
        let result = backend(DistanceMetric::Cosine)
            .build(vec![chunk("cat", 0)], Arc::new(BrokenEmbedder), "m")
            .await;
        assert!(matches!(result, Err(Error::Transformation(_))));
    }

    #[tokio::test]
    async fn test_empty_build_rejected() {
        let result = backend(DistanceMetric::Euclidean)
            .build(Vec::new(), Arc::new(KeywordEmbedder), "m")
            .await;
        assert!(matches!(result, Err(Error::Transformation(_))));
    }

    #[test]
    fn test_distance_to_score() {
        assert_eq!(DistanceMetric::Cosine.score(0.0), 1.0);
        assert_eq!(DistanceMetric::Euclidean.score(5.0), -5.0);
    }
}
