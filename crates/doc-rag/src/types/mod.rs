//! Core types shared by ingestion, indexing and querying

pub mod document;

pub use document::{Chunk, DocumentRecord, Kind, Locator};
