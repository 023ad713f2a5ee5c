//! File-type specific text extraction.

use std::path::Path;

use anyhow::{anyhow, Result};
use kbsearch_core::traits::TextExtractor;

/// UTF-8 text; invalid sequences are replaced rather than rejected.
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extensions(&self) -> &[&'static str] { &["txt"] }

    fn extract(&self, bytes: &[u8]) -> Result<String> {
        match std::str::from_utf8(bytes) {
            Ok(text) => Ok(text.to_string()),
            Err(_) => Ok(String::from_utf8_lossy(bytes).to_string()),
        }
    }
}

pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extensions(&self) -> &[&'static str] { &["pdf"] }

    fn extract(&self, bytes: &[u8]) -> Result<String> {
        // pdf-extract panics on some malformed documents
        match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(anyhow!("PDF read failed: {e}")),
            Err(_) => Err(anyhow!("PDF parser aborted on malformed input")),
        }
    }
}

/// Routes files to an extractor by lower-cased extension.
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn TextExtractor>>,
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self { extractors: vec![Box::new(PlainTextExtractor), Box::new(PdfExtractor)] }
    }
}

impl ExtractorRegistry {
    pub fn empty() -> Self { Self { extractors: Vec::new() } }

    pub fn register(&mut self, extractor: Box<dyn TextExtractor>) { self.extractors.push(extractor); }

    pub fn for_path(&self, path: &Path) -> Option<&dyn TextExtractor> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        self.extractors
            .iter()
            .find(|e| e.extensions().contains(&ext.as_str()))
            .map(|e| e.as_ref())
    }
}
