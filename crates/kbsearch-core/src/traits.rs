//! Seams to the collaborators the pipeline treats as black boxes.

/// Maps text to a fixed-length vector.
///
/// Implementations must be deterministic for identical input and must use the
/// same vector space for ingestion-time and query-time calls.
pub trait Embedder: Send + Sync {
    /// Stable identifier of the model behind this embedder.
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Converts the bytes of one file type into raw text.
pub trait TextExtractor: Send + Sync {
    /// Lower-case file extensions this extractor handles, without the dot.
    fn extensions(&self) -> &[&'static str];
    fn extract(&self, bytes: &[u8]) -> anyhow::Result<String>;
}

/// Turns ranked chunk texts into a prose answer.
pub trait Synthesizer: Send + Sync {
    fn synthesize(&self, query: &str, chunks: &[&str]) -> anyhow::Result<String>;
}
