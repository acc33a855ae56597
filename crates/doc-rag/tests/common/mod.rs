//! Shared fixtures for HTTP tests: offline providers and request helpers

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Semaphore;
use tower::ServiceExt;

use doc_rag::{
    ingestion::{DocumentLoader, LoaderRegistry, TextLoader},
    providers::{EmbeddingProvider, LlmProvider, VectorStoreRegistry},
    AppState, DocumentRecord, RagConfig, Result,
};

pub const BOUNDARY: &str = "doc-rag-test-boundary";

/// Hashed bag-of-words vectors; no network
pub struct HashEmbedder {
    gate: Option<Arc<Semaphore>>,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self { gate: None }
    }

    /// Every call waits until the semaphore has a permit
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self { gate: Some(gate) }
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, _model: &str, text: &str) -> Result<Vec<f32>> {
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await;
        }
        let mut vector = vec![0.0f32; 32];
        for word in text.split_whitespace() {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            vector[(hasher.finish() % 32) as usize] += 1.0;
        }
        vector[0] += 0.01;
        Ok(vector)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// Echoes how much context it was given
pub struct EchoLlm;

#[async_trait]
impl LlmProvider for EchoLlm {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        Ok(format!("[{}] answered from a {} character prompt", model, prompt.len()))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "echo"
    }
}

/// Text loader that blocks until the test releases it
pub struct GatedLoader {
    release: std::sync::Mutex<std::sync::mpsc::Receiver<()>>,
}

impl GatedLoader {
    pub fn new() -> (Self, std::sync::mpsc::Sender<()>) {
        let (tx, rx) = std::sync::mpsc::channel();
        (
            Self {
                release: std::sync::Mutex::new(rx),
            },
            tx,
        )
    }
}

impl DocumentLoader for GatedLoader {
    fn load(&self, path: &Path) -> Result<Vec<DocumentRecord>> {
        if let Ok(rx) = self.release.lock() {
            let _ = rx.recv();
        }
        TextLoader.load(path)
    }

    fn name(&self) -> &str {
        "gated-text"
    }
}

/// Router plus the scratch directory it writes uploads into
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub temp: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(adjust: impl FnOnce(&mut RagConfig)) -> Self {
        Self::build(adjust, LoaderRegistry::with_defaults(), HashEmbedder::new())
    }

    pub fn build(
        adjust: impl FnOnce(&mut RagConfig),
        loaders: LoaderRegistry,
        embedder: HashEmbedder,
    ) -> Self {
        let temp = tempfile::tempdir().unwrap();
        let mut config = RagConfig::default();
        config.server.temp_dir = temp.path().join("uploads");
        config.server.upload_chunk_size = 64 * 1024;
        adjust(&mut config);

        let state = AppState::with_components(
            config,
            loaders,
            VectorStoreRegistry::with_defaults(),
            Arc::new(embedder),
            Arc::new(EchoLlm),
        )
        .map_err(|e| e.to_string())
        .unwrap();

        Self {
            router: doc_rag::router(state.clone()),
            state,
            temp,
        }
    }

    /// Files left in the upload directory
    pub fn leftover_uploads(&self) -> usize {
        match std::fs::read_dir(&self.state.config().server.temp_dir) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn upload(&self, uri: &str, filename: &str, content: &[u8]) -> (StatusCode, serde_json::Value) {
        self.send(multipart_request(uri, filename, content)).await
    }

    pub async fn ask(&self, query: &str) -> (StatusCode, serde_json::Value) {
        let body = serde_json::json!({ "input": { "query": query } });
        self.send(
            Request::post("/query/invoke")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }
}

pub fn multipart_request(uri: &str, filename: &str, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::post(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}
