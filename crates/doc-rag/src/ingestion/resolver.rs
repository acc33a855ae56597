//! File kind resolution from extension, falling back to content signatures

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::config::ResolverConfig;
use crate::error::{Error, Result};
use crate::types::Kind;

/// Bytes read from the head of a file for signature checks
const SNIFF_LEN: usize = 8192;

const PDF_MAGIC: &[u8] = b"%PDF-";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
/// OLE2 compound document header; shared by legacy .xls, .doc and .ppt
const OLE2_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Maps file paths to document kinds
#[derive(Debug, Clone)]
pub struct TypeResolver {
    extensions: HashMap<String, Kind>,
}

impl TypeResolver {
    /// Create a resolver from configuration
    pub fn new(config: &ResolverConfig) -> Self {
        let extensions = config
            .extensions
            .iter()
            .map(|(ext, kind)| (ext.trim_start_matches('.').to_lowercase(), *kind))
            .collect();
        Self { extensions }
    }

    /// Resolve a path to a kind
    ///
    /// A configured extension wins. Otherwise the file content is sniffed;
    /// anything unrecognised is `Kind::Unknown`.
    pub fn resolve(&self, path: &Path) -> Kind {
        if let Some(kind) = self.resolve_extension(path) {
            return kind;
        }
        let kind = sniff_file(path);
        tracing::debug!("Sniffed {} as {}", path.display(), kind);
        kind
    }

    /// Resolve and reject `Kind::Unknown`
    pub fn resolve_supported(&self, path: &Path) -> Result<Kind> {
        match self.resolve(path) {
            Kind::Unknown => Err(Error::UnsupportedKind(format!(
                "could not determine the document type of '{}'",
                path.file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.display().to_string())
            ))),
            kind => Ok(kind),
        }
    }

    /// Kind from the configured extension table only
    pub fn resolve_extension(&self, path: &Path) -> Option<Kind> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        if ext.is_empty() {
            return None;
        }
        self.extensions.get(&ext).copied()
    }
}

/// Classify a file by its leading bytes
pub fn sniff_file(path: &Path) -> Kind {
    let mut header = Vec::with_capacity(SNIFF_LEN);
    let read = File::open(path).and_then(|file| file.take(SNIFF_LEN as u64).read_to_end(&mut header));
    if let Err(e) = read {
        tracing::warn!("Cannot read {} for type detection: {}", path.display(), e);
        return Kind::Unknown;
    }

    if header.starts_with(ZIP_MAGIC) {
        return sniff_zip(path);
    }
    if header.starts_with(OLE2_MAGIC) {
        return sniff_ole2(path);
    }
    sniff_bytes(&header)
}

/// Classify a byte prefix
///
/// Zip and OLE2 containers report `Unknown` here because telling them apart
/// needs the container directory.
pub fn sniff_bytes(header: &[u8]) -> Kind {
    if header.starts_with(PDF_MAGIC) {
        Kind::Pdf
    } else if header.starts_with(OLE2_MAGIC) {
        Kind::Unknown
    } else if looks_like_text(header) {
        Kind::PlainText
    } else {
        Kind::Unknown
    }
}

/// A zip container is a spreadsheet when it carries an `xl/` workbook part
fn sniff_zip(path: &Path) -> Kind {
    let archive = File::open(path)
        .map_err(|e| e.to_string())
        .and_then(|file| zip::ZipArchive::new(file).map_err(|e| e.to_string()));

    match archive {
        Ok(archive) => {
            if archive.file_names().any(|name| name.starts_with("xl/")) {
                Kind::Spreadsheet
            } else {
                Kind::Unknown
            }
        }
        Err(e) => {
            tracing::debug!("Zip signature but unreadable archive {}: {}", path.display(), e);
            Kind::Unknown
        }
    }
}

/// An OLE2 container is a spreadsheet when calamine can open it as a BIFF workbook
fn sniff_ole2(path: &Path) -> Kind {
    match calamine::open_workbook::<calamine::Xls<_>, _>(path) {
        Ok(_) => Kind::Spreadsheet,
        Err(e) => {
            tracing::debug!("OLE2 container {} is not a workbook: {}", path.display(), e);
            Kind::Unknown
        }
    }
}

fn looks_like_text(sample: &[u8]) -> bool {
    if sample.is_empty() || sample.contains(&0) {
        return false;
    }

    let valid = match std::str::from_utf8(sample) {
        Ok(_) => true,
        // A multi-byte character cut off by the sample boundary is fine
        Err(e) => e.error_len().is_none() && e.valid_up_to() > 0,
    };
    if !valid {
        return false;
    }

    let control = sample
        .iter()
        .filter(|b| **b < 0x20 && !matches!(**b, b'\n' | b'\r' | b'\t' | 0x0C | 0x1B))
        .count();
    control * 10 < sample.len()
}
