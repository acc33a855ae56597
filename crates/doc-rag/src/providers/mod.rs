//! Provider abstractions for embeddings, LLM generation and vector indexes
//!
//! Trait-based so handlers and tests can swap Ollama, hosted chat APIs and
//! HNSW indexes without touching the pipeline.

pub mod embedding;
pub mod hnsw;
pub mod llm;
pub mod ollama;
pub mod openai;
mod retry;
pub mod vector_store;

pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use hnsw::{DistanceMetric, HnswBackend, HnswIndex};
pub use ollama::{OllamaClient, OllamaEmbedder, OllamaLlm};
pub use openai::OpenAiCompatLlm;
pub use retry::Backoff;
pub use vector_store::{ScoredChunk, VectorIndex, VectorStoreBackend, VectorStoreRegistry};
