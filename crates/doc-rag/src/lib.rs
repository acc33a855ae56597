//! doc-rag: upload a single document and ask questions about it
//!
//! Uploads are streamed to temporary storage, classified by extension or
//! content signature, loaded with a per-kind loader, chunked, embedded and
//! indexed in memory. Questions are answered by an LLM from the top matching
//! chunks of the most recent upload.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod processing;
pub mod providers;
pub mod server;
pub mod session;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use server::{router, state::AppState, RagServer};
pub use types::{Chunk, DocumentRecord, Kind, Locator};
