//! Word-window chunking.
//!
//! Text is split on whitespace and cut into windows of `chunk_size` words,
//! each window starting `chunk_size - overlap` words after the previous one.
//! The last window always ends on the final word, so no trailing window is
//! emitted whose words are already fully covered by its predecessor.

use crate::error::{Error, Result};

pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_OVERLAP: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self { chunk_size: DEFAULT_CHUNK_SIZE, overlap: DEFAULT_OVERLAP }
    }
}

impl Chunker {
    /// Fails with [`Error::Configuration`] unless `chunk_size > overlap`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Configuration("chunk_size must be at least 1".to_string()));
        }
        if overlap >= chunk_size {
            return Err(Error::Configuration(format!(
                "overlap ({overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, overlap })
    }

    pub fn chunk_size(&self) -> usize { self.chunk_size }

    pub fn overlap(&self) -> usize { self.overlap }

    pub fn stride(&self) -> usize { self.chunk_size - self.overlap }

    /// Word offsets at which each window starts for a text of `word_count` words.
    pub fn window_starts(&self, word_count: usize) -> Vec<usize> {
        let mut starts = Vec::new();
        if word_count == 0 {
            return starts;
        }
        let mut start = 0;
        loop {
            starts.push(start);
            if start + self.chunk_size >= word_count {
                break;
            }
            start += self.stride();
        }
        starts
    }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        self.window_starts(words.len())
            .into_iter()
            .map(|start| {
                let end = (start + self.chunk_size).min(words.len());
                words[start..end].join(" ")
            })
            .filter(|chunk| !chunk.trim().is_empty())
            .collect()
    }
}

/// One-shot form of [`Chunker::chunk`] that validates its parameters.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    Ok(Chunker::new(chunk_size, overlap)?.chunk(text))
}
