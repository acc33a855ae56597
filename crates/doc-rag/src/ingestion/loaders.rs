//! Document loaders, one per supported format

use calamine::Reader;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::{DocumentRecord, Locator};

/// Turns a file on disk into an ordered sequence of raw records
///
/// Loaders are synchronous and may be CPU heavy; callers run them on the
/// blocking pool.
pub trait DocumentLoader: Send + Sync {
    /// Load the file
    fn load(&self, path: &Path) -> Result<Vec<DocumentRecord>>;

    /// Get loader name for logging
    fn name(&self) -> &str;
}

/// Loader lookup by configured name
#[derive(Clone, Default)]
pub struct LoaderRegistry {
    loaders: HashMap<String, Arc<dyn DocumentLoader>>,
}

impl LoaderRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in loaders
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("text", Arc::new(TextLoader));
        registry.register("pdf", Arc::new(PdfLoader));
        registry.register("spreadsheet", Arc::new(SpreadsheetLoader));
        registry.register("csv", Arc::new(CsvLoader));
        registry.register("word", Arc::new(WordLoader));
        registry
    }

    /// Add or replace a loader
    pub fn register(&mut self, name: impl Into<String>, loader: Arc<dyn DocumentLoader>) {
        self.loaders.insert(name.into(), loader);
    }

    /// Get a loader by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn DocumentLoader>> {
        self.loaders.get(name).cloned()
    }

    /// Registered names
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.loaders.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Whole file as a single UTF-8 record
pub struct TextLoader;

impl DocumentLoader for TextLoader {
    fn load(&self, path: &Path) -> Result<Vec<DocumentRecord>> {
        let data = std::fs::read(path).map_err(|e| Error::ingestion(path, e.to_string()))?;
        let content = String::from_utf8(data)
            .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned());
        Ok(vec![DocumentRecord::new(content, path)])
    }

    fn name(&self) -> &str {
        "text"
    }
}

/// One record per PDF page
pub struct PdfLoader;

impl PdfLoader {
    fn clean(text: &str) -> String {
        text.replace('\0', "")
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Whole-document extraction for PDFs whose pages yield nothing via lopdf
    fn load_whole(path: &Path) -> Result<Vec<DocumentRecord>> {
        let text = pdf_extract::extract_text(path)
            .map_err(|e| Error::ingestion(path, format!("PDF text extraction failed: {}", e)))?;
        let content = Self::clean(&text);
        if content.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![DocumentRecord::new(content, path).with_locator(Locator::Page(1))])
    }
}

impl DocumentLoader for PdfLoader {
    fn load(&self, path: &Path) -> Result<Vec<DocumentRecord>> {
        let doc = lopdf::Document::load(path)
            .map_err(|e| Error::ingestion(path, format!("Failed to open PDF: {}", e)))?;

        let mut records = Vec::new();
        for page_number in doc.get_pages().keys() {
            match doc.extract_text(&[*page_number]) {
                Ok(text) => {
                    let content = Self::clean(&text);
                    if !content.is_empty() {
                        records.push(
                            DocumentRecord::new(content, path)
                                .with_locator(Locator::Page(*page_number)),
                        );
                    }
                }
                Err(e) => {
                    tracing::debug!("Could not extract text from page {}: {}", page_number, e);
                }
            }
        }

        if records.is_empty() {
            tracing::warn!(
                "Per-page extraction found no text in {}, trying whole-document extraction",
                path.display()
            );
            return Self::load_whole(path);
        }

        Ok(records)
    }

    fn name(&self) -> &str {
        "pdf"
    }
}

/// One record per non-empty worksheet
pub struct SpreadsheetLoader;

impl DocumentLoader for SpreadsheetLoader {
    fn load(&self, path: &Path) -> Result<Vec<DocumentRecord>> {
        let mut workbook = calamine::open_workbook_auto(path)
            .map_err(|e| Error::ingestion(path, format!("Failed to open workbook: {}", e)))?;

        let mut records = Vec::new();
        for sheet_name in workbook.sheet_names().to_vec() {
            let range = match workbook.worksheet_range(&sheet_name) {
                Ok(range) => range,
                Err(e) => {
                    tracing::warn!("Skipping sheet '{}': {}", sheet_name, e);
                    continue;
                }
            };

            let mut sheet_content = String::new();
            for row in range.rows() {
                let row_text: Vec<String> = row
                    .iter()
                    .map(|cell| match cell {
                        calamine::Data::Empty => String::new(),
                        calamine::Data::String(s) => s.clone(),
                        calamine::Data::Float(f) => f.to_string(),
                        calamine::Data::Int(i) => i.to_string(),
                        calamine::Data::Bool(b) => b.to_string(),
                        calamine::Data::DateTime(dt) => dt.to_string(),
                        calamine::Data::DateTimeIso(s) | calamine::Data::DurationIso(s) => s.clone(),
                        _ => String::new(),
                    })
                    .collect();

                if !row_text.iter().all(|s| s.is_empty()) {
                    sheet_content.push_str(&row_text.join(" | "));
                    sheet_content.push('\n');
                }
            }

            if !sheet_content.is_empty() {
                records.push(
                    DocumentRecord::new(sheet_content, path)
                        .with_locator(Locator::Sheet(sheet_name)),
                );
            }
        }

        Ok(records)
    }

    fn name(&self) -> &str {
        "spreadsheet"
    }
}

/// One record per data row, rendered as `header: value` lines
pub struct CsvLoader;

impl DocumentLoader for CsvLoader {
    fn load(&self, path: &Path) -> Result<Vec<DocumentRecord>> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| Error::ingestion(path, e.to_string()))?;

        let headers = reader
            .headers()
            .map_err(|e| Error::ingestion(path, format!("Failed to read CSV header: {}", e)))?
            .clone();

        let mut records = Vec::new();
        for (row, result) in reader.records().enumerate() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!("Skipping malformed CSV row {}: {}", row, e);
                    continue;
                }
            };

            let content = record
                .iter()
                .enumerate()
                .map(|(i, value)| match headers.get(i) {
                    Some(header) => format!("{}: {}", header.trim(), value.trim()),
                    None => value.trim().to_string(),
                })
                .collect::<Vec<_>>()
                .join("\n");

            records.push(DocumentRecord::new(content, path).with_locator(Locator::Row(row)));
        }

        Ok(records)
    }

    fn name(&self) -> &str {
        "csv"
    }
}

/// Paragraph text of a .docx document
pub struct WordLoader;

impl DocumentLoader for WordLoader {
    fn load(&self, path: &Path) -> Result<Vec<DocumentRecord>> {
        let data = std::fs::read(path).map_err(|e| Error::ingestion(path, e.to_string()))?;
        let doc = docx_rs::read_docx(&data)
            .map_err(|e| Error::ingestion(path, format!("Failed to read DOCX: {}", e)))?;

        let mut content = String::new();
        for child in doc.document.children {
            if let docx_rs::DocumentChild::Paragraph(p) = child {
                for child in p.children {
                    if let docx_rs::ParagraphChild::Run(run) = child {
                        for child in run.children {
                            if let docx_rs::RunChild::Text(t) = child {
                                content.push_str(&t.text);
                            }
                        }
                    }
                }
                content.push('\n');
            }
        }

        Ok(vec![DocumentRecord::new(content, path)])
    }

    fn name(&self) -> &str {
        "word"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_names() {
        let registry = LoaderRegistry::with_defaults();
        assert_eq!(registry.names(), vec!["csv", "pdf", "spreadsheet", "text", "word"]);
        assert!(registry.get("text").is_some());
        assert!(registry.get("markdown").is_none());
    }

    #[test]
    fn test_text_loader_single_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "line one\nline two").unwrap();

        let records = TextLoader.load(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].content, "line one\nline two");
        assert_eq!(records[0].source, path);
        assert!(records[0].locator.is_none());
    }

    #[test]
    fn test_csv_loader_row_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.csv");
        std::fs::write(&path, "name,age\nAda,36\nAlan,41\n").unwrap();

        let records = CsvLoader.load(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].content, "name: Ada\nage: 36");
        assert_eq!(records[1].locator, Some(Locator::Row(1)));
    }

    #[test]
    fn test_missing_file_is_ingestion_error() {
        let err = TextLoader.load(Path::new("/no/such/file.txt")).unwrap_err();
        assert!(matches!(err, Error::Ingestion { ref path, .. } if path.contains("file.txt")));
    }

    #[test]
    fn test_corrupt_pdf_is_ingestion_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.4 not really").unwrap();
        assert!(matches!(PdfLoader.load(&path), Err(Error::Ingestion { .. })));
    }
}
