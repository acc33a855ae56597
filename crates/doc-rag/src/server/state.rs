//! Application state shared by every handler

use std::sync::Arc;
use std::time::Duration;

use crate::config::{LlmBackend, RagConfig};
use crate::error::Result;
use crate::generation::QueryEngine;
use crate::ingestion::{IngestionDispatcher, LoaderRegistry, TypeResolver};
use crate::processing::{JobStore, TransformationPipeline, WindowSplitter};
use crate::providers::{
    EmbeddingProvider, LlmProvider, OllamaClient, OllamaEmbedder, OllamaLlm, OpenAiCompatLlm,
    VectorStoreRegistry,
};
use crate::session::SessionStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RagConfig,
    resolver: Arc<TypeResolver>,
    dispatcher: IngestionDispatcher,
    pipeline: TransformationPipeline,
    query_engine: QueryEngine,
    sessions: Arc<SessionStore>,
    jobs: Arc<JobStore>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    llm_provider: Arc<dyn LlmProvider>,
}

impl AppState {
    /// Create state with Ollama embeddings and the configured LLM backend
    pub fn new(config: RagConfig) -> Result<Self> {
        tracing::info!(
            "Initializing application state (LLM backend: {:?})...",
            config.llm.provider
        );

        let ollama = Arc::new(OllamaClient::new(&config.ollama)?);
        tracing::info!("Ollama client initialized at {}", config.ollama.base_url);

        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(OllamaEmbedder::new(ollama.clone()));
        let llm: Arc<dyn LlmProvider> = match config.llm.provider {
            LlmBackend::Ollama => Arc::new(OllamaLlm::new(ollama)),
            LlmBackend::OpenAi => {
                tracing::info!("Using OpenAI-compatible LLM at {}", config.llm.base_url);
                Arc::new(OpenAiCompatLlm::new(&config.llm)?)
            }
        };

        Self::with_providers(config, embedder, llm)
    }

    /// Create state around the given providers with the built-in loaders and stores
    pub fn with_providers(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
    ) -> Result<Self> {
        let stores = VectorStoreRegistry::with_hnsw(&config.vector_index);
        Self::with_components(
            config,
            LoaderRegistry::with_defaults(),
            stores,
            embedder,
            llm,
        )
    }

    /// Create state from explicit parts, validating the configuration against them
    pub fn with_components(
        config: RagConfig,
        loaders: LoaderRegistry,
        stores: VectorStoreRegistry,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
    ) -> Result<Self> {
        config.validate()?;
        config
            .dispatch
            .check_registered(&loaders.names(), &stores.names())?;

        let dispatch = Arc::new(config.dispatch.clone());
        let resolver = Arc::new(TypeResolver::new(&config.resolver));
        let sessions = Arc::new(SessionStore::new());
        let jobs = Arc::new(JobStore::new(Duration::from_secs(config.jobs.ttl_secs)));

        let dispatcher = IngestionDispatcher::new(Arc::new(loaders), dispatch.clone());
        let pipeline = TransformationPipeline::new(
            Arc::new(WindowSplitter::new(
                config.chunking.chunk_size,
                config.chunking.chunk_overlap,
            )),
            dispatch.clone(),
            Arc::new(stores),
            embedder.clone(),
            config.chunking.embed_cap(),
        );
        let query_engine = QueryEngine::new(
            sessions.clone(),
            resolver.clone(),
            dispatch,
            llm.clone(),
            config.retrieval.top_k,
        );

        tracing::info!(
            "Pipeline ready: chunk size {}, overlap {}, embed cap {:?}, top-k {}",
            config.chunking.chunk_size,
            config.chunking.chunk_overlap,
            config.chunking.embed_cap(),
            config.retrieval.top_k
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                resolver,
                dispatcher,
                pipeline,
                query_engine,
                sessions,
                jobs,
                embedding_provider: embedder,
                llm_provider: llm,
            }),
        })
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    pub fn resolver(&self) -> &TypeResolver {
        &self.inner.resolver
    }

    pub fn dispatcher(&self) -> &IngestionDispatcher {
        &self.inner.dispatcher
    }

    pub fn pipeline(&self) -> &TransformationPipeline {
        &self.inner.pipeline
    }

    pub fn query_engine(&self) -> &QueryEngine {
        &self.inner.query_engine
    }

    /// Active index holder
    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.inner.sessions
    }

    /// Background job table
    pub fn jobs(&self) -> &Arc<JobStore> {
        &self.inner.jobs
    }

    /// Get embedding provider
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.inner.embedding_provider
    }

    /// Get LLM provider
    pub fn llm_provider(&self) -> &Arc<dyn LlmProvider> {
        &self.inner.llm_provider
    }
}
