//! kbsearch-embed
//!
//! Embedders behind the `kbsearch_core::traits::Embedder` seam: the candle
//! MiniLM sentence model and a deterministic hash embedder for tests.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use kbsearch_core::config::{expand_path, EmbeddingBackend, EmbeddingSettings};
use kbsearch_core::traits::Embedder;

pub mod device;
pub mod hash;
pub mod minilm;
pub mod pool;
pub mod tokenize;

pub use hash::HashEmbedder;
pub use minilm::{MiniLmEmbedder, MINILM_DIM, MINILM_MODEL_ID};
pub use pool::masked_mean_l2;

/// True when `APP_USE_FAKE_EMBEDDINGS` is `1` or `true`.
pub fn fake_embeddings_requested() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Builds the embedder selected by `settings`; `APP_USE_FAKE_EMBEDDINGS`
/// overrides the backend with the hash embedder.
pub fn load_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    if fake_embeddings_requested() || settings.backend == EmbeddingBackend::Hash {
        tracing::info!(dim = settings.dimension, "using HashEmbedder");
        return Ok(Arc::new(HashEmbedder::new(settings.dimension)));
    }
    if settings.dimension != MINILM_DIM {
        anyhow::bail!("{MINILM_MODEL_ID} produces {MINILM_DIM}-d vectors, configured dimension is {}", settings.dimension);
    }
    let configured: Option<PathBuf> = settings.model_dir.as_deref().map(expand_path);
    let dir = minilm::resolve_model_dir(configured.as_deref())?;
    Ok(Arc::new(MiniLmEmbedder::load(&dir, settings.max_len)?))
}
