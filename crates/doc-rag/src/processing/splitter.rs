//! Fixed-window text splitting with overlap

use std::collections::VecDeque;
use unicode_segmentation::UnicodeSegmentation;

use crate::types::{Chunk, DocumentRecord};

/// Splits records into chunks
pub trait TextSplitter: Send + Sync {
    /// Chunk every record, numbering chunks across the whole sequence
    ///
    /// With `limit`, splitting stops as soon as that many chunks exist.
    fn split(&self, records: &[DocumentRecord], limit: Option<usize>) -> Vec<Chunk>;
}

/// Windows of `chunk_size` graphemes; each window after the first starts
/// `overlap` graphemes before the previous window's end
#[derive(Debug, Clone)]
pub struct WindowSplitter {
    chunk_size: usize,
    overlap: usize,
}

/// Byte span of one grapheme
#[derive(Debug, Clone, Copy)]
struct Span {
    start: usize,
    end: usize,
    whitespace: bool,
}

impl WindowSplitter {
    /// Create a splitter; `overlap` is clamped below `chunk_size`
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    /// Append the chunks of one record, holding at most `chunk_size`
    /// grapheme spans at a time. Returns false once `limit` is reached.
    fn split_record(
        &self,
        record_index: usize,
        record: &DocumentRecord,
        chunks: &mut Vec<Chunk>,
        limit: Option<usize>,
    ) -> bool {
        let text = record.content.as_str();
        let mut spans = text
            .grapheme_indices(true)
            .map(|(offset, g)| Span {
                start: offset,
                end: offset + g.len(),
                whitespace: is_whitespace(g),
            })
            .peekable();
        let mut window: VecDeque<Span> = VecDeque::with_capacity(self.chunk_size);
        let mut start = 0;

        loop {
            while window.len() < self.chunk_size {
                match spans.next() {
                    Some(span) => window.push_back(span),
                    None => break,
                }
            }
            if window.is_empty() {
                return true;
            }

            let last = spans.peek().is_none();
            let mut len = window.len();

            // Prefer to cut after whitespace, but never inside the overlap
            if !last {
                if let Some(cut) = (self.overlap + 1..=len)
                    .rev()
                    .find(|&i| window[i - 1].whitespace)
                {
                    len = cut;
                }
            }

            let content = &text[window[0].start..window[len - 1].end];
            if !content.trim().is_empty() {
                chunks.push(Chunk {
                    content: content.to_string(),
                    record_index,
                    chunk_index: chunks.len(),
                    start,
                    end: start + len,
                    source: record.source.clone(),
                    locator: record.locator.clone(),
                });
                if limit.is_some_and(|l| chunks.len() >= l) {
                    return false;
                }
            }

            if last {
                return true;
            }
            let advance = len - self.overlap;
            window.drain(..advance);
            start += advance;
        }
    }
}

fn is_whitespace(grapheme: &str) -> bool {
    grapheme.chars().all(char::is_whitespace)
}

impl TextSplitter for WindowSplitter {
    fn split(&self, records: &[DocumentRecord], limit: Option<usize>) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        if limit == Some(0) {
            return chunks;
        }

        for (record_index, record) in records.iter().enumerate() {
            if !self.split_record(record_index, record, &mut chunks, limit) {
                break;
            }
        }

        chunks
    }
}
