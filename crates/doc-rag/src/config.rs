//! Configuration for the upload / index / query service

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::Kind;

/// Environment variable naming a TOML config file
pub const CONFIG_ENV: &str = "DOC_RAG_CONFIG";

/// Main service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// HNSW graph parameters for the vector-store backends
    pub vector_index: VectorIndexConfig,
    /// Ollama configuration (embeddings, optionally generation)
    pub ollama: OllamaConfig,
    /// Answer generation backend
    pub llm: LlmConfig,
    /// Background job bookkeeping
    pub jobs: JobsConfig,
    /// Type resolver configuration
    pub resolver: ResolverConfig,
    /// Per-kind dispatch profiles
    pub dispatch: DispatchConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml(&raw)
            .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
    }

    /// Parse configuration from TOML text
    pub fn from_toml(raw: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Load from an explicit path, then `DOC_RAG_CONFIG`, then defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    /// Check invariants that do not depend on registered capabilities
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::Config("chunking.chunk_size must be > 0".to_string()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.server.upload_chunk_size == 0 {
            return Err(Error::Config("server.upload_chunk_size must be > 0".to_string()));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::Config("retrieval.top_k must be > 0".to_string()));
        }
        if self.vector_index.hnsw_m == 0 || self.vector_index.hnsw_ef_construction == 0 {
            return Err(Error::Config(
                "vector_index.hnsw_m and vector_index.hnsw_ef_construction must be > 0".to_string(),
            ));
        }
        for (ext, kind) in &self.resolver.extensions {
            if !kind.is_supported() {
                return Err(Error::Config(format!(
                    "resolver.extensions maps '{}' to the unknown kind",
                    ext
                )));
            }
        }
        self.dispatch.check_complete()
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 1GB)
    pub max_upload_size: u64,
    /// Write buffer size for streaming uploads to disk (default: 10MB)
    pub upload_chunk_size: usize,
    /// Directory for temporary upload files
    pub temp_dir: PathBuf,
    /// Idle keep-alive timeout for client connections
    pub keep_alive_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            enable_cors: true,
            max_upload_size: 1024 * 1024 * 1024, // 1GB
            upload_chunk_size: 10 * 1024 * 1024,  // 10MB
            temp_dir: PathBuf::from("temp"),
            keep_alive_secs: 300,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
    /// Upper bound on chunks sent to the embedding model; `None` embeds all
    pub max_chunks_embedded: Option<usize>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2000,
            chunk_overlap: 500,
            max_chunks_embedded: Some(20),
        }
    }
}

impl ChunkingConfig {
    /// Effective embedding cap (`0` is treated as no cap)
    pub fn embed_cap(&self) -> Option<usize> {
        self.max_chunks_embedded.filter(|cap| *cap > 0)
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks placed in the prompt context
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 4 }
    }
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorIndexConfig {
    /// HNSW M parameter (connections per layer)
    pub hnsw_m: usize,
    /// HNSW ef_construction parameter
    pub hnsw_ef_construction: usize,
    /// HNSW ef_search parameter
    pub hnsw_ef_search: usize,
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            hnsw_m: 32,
            hnsw_ef_construction: 200,
            hnsw_ef_search: 100,
        }
    }
}

/// Ollama configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            temperature: 0.3,
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

/// Which API serves answer generation
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    /// Local Ollama server (`/api/generate`)
    Ollama,
    /// OpenAI-compatible chat completions (Groq by default)
    #[default]
    OpenAi,
}

/// Answer generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Backend selection
    pub provider: LlmBackend,
    /// Base URL of the OpenAI-compatible API
    pub base_url: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmBackend::OpenAi,
            base_url: "https://api.groq.com/openai/v1".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            temperature: 0.3,
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

/// Background job bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// Seconds a finished job stays queryable
    pub ttl_secs: u64,
    /// Seconds between expiry sweeps
    pub sweep_interval_secs: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            sweep_interval_secs: 60,
        }
    }
}

/// Type resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Lower-case extension (without dot) to kind
    pub extensions: HashMap<String, Kind>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        let extensions = [
            ("txt", Kind::PlainText),
            ("pdf", Kind::Pdf),
            ("xlsx", Kind::Spreadsheet),
            ("xls", Kind::Spreadsheet),
            ("csv", Kind::Csv),
            ("docx", Kind::WordDoc),
        ]
        .into_iter()
        .map(|(ext, kind)| (ext.to_string(), kind))
        .collect();
        Self { extensions }
    }
}

/// Everything needed to process one kind of document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KindProfile {
    /// Registered loader name
    pub loader: String,
    /// Registered vector-store backend name
    pub vector_store: String,
    /// Embedding model identifier
    pub embedding_model: String,
    /// LLM identifier
    pub llm_model: String,
}

impl KindProfile {
    fn new(loader: &str, vector_store: &str, embedding_model: &str, llm_model: &str) -> Self {
        Self {
            loader: loader.to_string(),
            vector_store: vector_store.to_string(),
            embedding_model: embedding_model.to_string(),
            llm_model: llm_model.to_string(),
        }
    }
}

/// One profile per kind; a missing profile is a configuration error
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub plain_text: Option<KindProfile>,
    pub pdf: Option<KindProfile>,
    pub spreadsheet: Option<KindProfile>,
    pub csv: Option<KindProfile>,
    pub word_doc: Option<KindProfile>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            plain_text: Some(KindProfile::new(
                "text",
                "hnsw-cosine",
                "nomic-embed-text:v1.5",
                "allam-2-7b",
            )),
            pdf: Some(KindProfile::new(
                "pdf",
                "hnsw-euclidean",
                "snowflake-arctic-embed:335m",
                "llama-3.1-8b-instant",
            )),
            spreadsheet: Some(KindProfile::new(
                "spreadsheet",
                "hnsw-cosine",
                "nomic-embed-text:v1.5",
                "llama-3.1-8b-instant",
            )),
            csv: Some(KindProfile::new(
                "csv",
                "hnsw-euclidean",
                "nomic-embed-text:v1.5",
                "groq/compound",
            )),
            word_doc: Some(KindProfile::new(
                "word",
                "hnsw-cosine",
                "snowflake-arctic-embed:335m",
                "allam-2-7b",
            )),
        }
    }
}

impl DispatchConfig {
    /// Look up the profile for a kind
    pub fn profile(&self, kind: Kind) -> Result<&KindProfile> {
        let entry = match kind {
            Kind::PlainText => self.plain_text.as_ref(),
            Kind::Pdf => self.pdf.as_ref(),
            Kind::Spreadsheet => self.spreadsheet.as_ref(),
            Kind::Csv => self.csv.as_ref(),
            Kind::WordDoc => self.word_doc.as_ref(),
            Kind::Unknown => None,
        };
        entry.ok_or_else(|| {
            Error::Config(format!("No dispatch profile configured for kind '{}'", kind))
        })
    }

    /// Every supported kind must have a profile
    pub fn check_complete(&self) -> Result<()> {
        let missing: Vec<&str> = Kind::SUPPORTED
            .iter()
            .filter(|kind| self.profile(**kind).is_err())
            .map(|kind| kind.as_str())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(format!(
                "Missing dispatch profiles for: {}",
                missing.join(", ")
            )))
        }
    }

    /// Every profile must name a registered loader and vector store
    pub fn check_registered(&self, loaders: &[&str], vector_stores: &[&str]) -> Result<()> {
        for kind in Kind::SUPPORTED {
            let profile = self.profile(kind)?;
            if !loaders.contains(&profile.loader.as_str()) {
                return Err(Error::Config(format!(
                    "Kind '{}' uses unknown loader '{}' (available: {})",
                    kind,
                    profile.loader,
                    loaders.join(", ")
                )));
            }
            if !vector_stores.contains(&profile.vector_store.as_str()) {
                return Err(Error::Config(format!(
                    "Kind '{}' uses unknown vector store '{}' (available: {})",
                    kind,
                    profile.vector_store,
                    vector_stores.join(", ")
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RagConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.max_upload_size, 1_073_741_824);
        assert_eq!(config.chunking.chunk_size, 2000);
        assert_eq!(config.chunking.chunk_overlap, 500);
        assert_eq!(config.chunking.embed_cap(), Some(20));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RagConfig::from_toml(
            r#"
            [server]
            port = 9000

            [chunking]
            max_chunks_embedded = 0

            [dispatch.csv]
            loader = "csv"
            vector_store = "hnsw-cosine"
            embedding_model = "nomic-embed-text"
            llm_model = "llama3"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.upload_chunk_size, 10 * 1024 * 1024);
        assert_eq!(config.chunking.embed_cap(), None);
        assert_eq!(config.dispatch.profile(Kind::Csv).unwrap().llm_model, "llama3");
        assert!(config.dispatch.profile(Kind::Pdf).is_ok());
    }

    #[test]
    fn test_missing_profile_fails_fast() {
        let mut config = RagConfig::default();
        config.dispatch.word_doc = None;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("word_doc")));
        assert!(config.dispatch.profile(Kind::Unknown).is_err());
    }

    #[test]
    fn test_zero_hnsw_m_rejected() {
        let mut config = RagConfig::default();
        config.vector_index.hnsw_m = 0;
        assert!(matches!(config.validate(), Err(Error::Config(ref msg)) if msg.contains("hnsw_m")));
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk() {
        let mut config = RagConfig::default();
        config.chunking.chunk_overlap = 2000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_check_registered() {
        let dispatch = DispatchConfig::default();
        let loaders = ["text", "pdf", "spreadsheet", "csv", "word"];
        assert!(dispatch
            .check_registered(&loaders, &["hnsw-cosine", "hnsw-euclidean"])
            .is_ok());
        assert!(dispatch.check_registered(&loaders, &["hnsw-cosine"]).is_err());
    }
}
