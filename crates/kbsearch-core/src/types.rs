//! Domain types shared by the ingestion, index and retrieval crates.

use serde::{Deserialize, Serialize};

/// One retrievable chunk of a source document.
///
/// - `text`: the chunk payload, never blank
/// - `vector`: the chunk embedding, `dim` floats as fixed by the embedder
/// - `source_id`: identity of the originating document (relative file path)
/// - `position`: zero-based index of this chunk within its source document
///
/// Records are immutable once appended to a corpus store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub text: String,
    pub vector: Vec<f32>,
    pub source_id: String,
    pub position: usize,
}

/// A raw index hit: the row position in the index and its squared L2 distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub position: usize,
    pub distance: f32,
}

/// A ranked retrieval result.
///
/// `distance` is the squared Euclidean distance to the query and
/// `similarity` is `1 / (1 + distance)`, so it lies in `(0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub chunk: ChunkRecord,
    pub distance: f32,
    pub similarity: f32,
}

impl QueryResult {
    pub fn new(chunk: ChunkRecord, distance: f32) -> Self {
        Self { chunk, distance, similarity: similarity_from_distance(distance) }
    }
}

/// Maps a non-negative squared distance to a score in `(0, 1]`.
pub fn similarity_from_distance(distance: f32) -> f32 {
    1.0 / (1.0 + distance.max(0.0))
}

/// Summary of a built corpus, as reported to the query layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub total_chunks: usize,
    pub total_documents: usize,
    pub index_size: usize,
    pub embedding_dimension: usize,
    pub model: String,
}
