//! Document kinds, raw document records and chunks with source tracking

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Closed set of document kinds used to select loader, embedding model,
/// vector store and LLM
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    /// Plain text file
    PlainText,
    /// PDF document
    Pdf,
    /// Excel workbook (.xlsx or legacy .xls)
    Spreadsheet,
    /// Comma-separated values
    Csv,
    /// Word document (.docx)
    WordDoc,
    /// Could not be classified
    Unknown,
}

impl Kind {
    /// Every kind the resolver can hand to the pipeline
    pub const SUPPORTED: [Kind; 5] = [
        Kind::PlainText,
        Kind::Pdf,
        Kind::Spreadsheet,
        Kind::Csv,
        Kind::WordDoc,
    ];

    /// Check if this kind can be processed
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::PlainText => "Text File",
            Self::Pdf => "PDF",
            Self::Spreadsheet => "Excel Spreadsheet",
            Self::Csv => "CSV",
            Self::WordDoc => "Word Document",
            Self::Unknown => "Unknown",
        }
    }

    /// Configuration key for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlainText => "plain_text",
            Self::Pdf => "pdf",
            Self::Spreadsheet => "spreadsheet",
            Self::Csv => "csv",
            Self::WordDoc => "word_doc",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a record inside its source file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Locator {
    /// 1-indexed page number
    Page(u32),
    /// Worksheet name
    Sheet(String),
    /// 0-indexed data row
    Row(usize),
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Page(n) => write!(f, "page {}", n),
            Locator::Sheet(name) => write!(f, "sheet {}", name),
            Locator::Row(n) => write!(f, "row {}", n),
        }
    }
}

/// Raw text produced by a loader, immutable once produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Extracted text
    pub content: String,
    /// File the record was read from
    pub source: PathBuf,
    /// Page, sheet or row inside the source
    pub locator: Option<Locator>,
}

impl DocumentRecord {
    /// Create a record covering a whole file
    pub fn new(content: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
            locator: None,
        }
    }

    /// Attach a locator
    pub fn with_locator(mut self, locator: Locator) -> Self {
        self.locator = Some(locator);
        self
    }
}

/// A bounded slice of a record's text, the unit that gets embedded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk text
    pub content: String,
    /// Index of the source record in the ingested sequence
    pub record_index: usize,
    /// Position of this chunk in the overall chunk sequence
    pub chunk_index: usize,
    /// Grapheme offset of the chunk start inside the record
    pub start: usize,
    /// Grapheme offset one past the chunk end inside the record
    pub end: usize,
    /// Source file of the record
    pub source: PathBuf,
    /// Locator of the record
    pub locator: Option<Locator>,
}

impl Chunk {
    /// Human-readable reference for logs and debugging
    pub fn source_ref(&self) -> String {
        let name = self
            .source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        match &self.locator {
            Some(locator) => format!("{} ({}) [{}..{}]", name, locator, self.start, self.end),
            None => format!("{} [{}..{}]", name, self.start, self.end),
        }
    }
}
