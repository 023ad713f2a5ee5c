use std::hash::{Hash, Hasher};

use anyhow::{ensure, Result};
use kbsearch_core::traits::Embedder;
use twox_hash::XxHash64;

/// Deterministic bag-of-words embedder: every whitespace token is hashed into
/// one of `dim` buckets and the result is L2-normalised. Texts that share
/// tokens land close together, which is enough for tests and offline runs.
pub struct HashEmbedder {
    dim: usize,
    id: String,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim, id: format!("hash:xxh64:d{dim}") }
    }
}

impl Embedder for HashEmbedder {
    fn id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { usize::MAX }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        ensure!(self.dim > 0, "hash embedder dimension must be positive");
        let mut v = vec![0f32; self.dim];
        for token in text.split_whitespace() {
            let token = token.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
            if token.is_empty() { continue; }
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            let val = ((h >> 32) as u32) as f32 / u32::MAX as f32;
            v[idx] += 0.5 + val;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        Ok(v)
    }
}
