use std::collections::BTreeSet;

use kbsearch_core::types::ChunkRecord;
use kbsearch_core::{Error, Result};

/// Ordered chunk records; insertion order is index position.
///
/// Records can only be appended while a [`crate::CorpusBuilder`] owns the
/// store. Once handed out it is never reordered or shrunk.
#[derive(Debug, Clone)]
pub struct CorpusStore {
    dim: usize,
    records: Vec<ChunkRecord>,
}

impl CorpusStore {
    pub(crate) fn new(dim: usize) -> Self { Self { dim, records: Vec::new() } }

    /// Assembles a store from finished records, checking every vector width.
    pub fn from_records(records: Vec<ChunkRecord>, dim: usize) -> Result<Self> {
        let mut store = Self::new(dim);
        for record in records { store.append(record)?; }
        Ok(store)
    }

    pub(crate) fn append(&mut self, record: ChunkRecord) -> Result<usize> {
        if record.vector.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: record.vector.len() });
        }
        if record.text.trim().is_empty() {
            return Err(Error::Operation(format!("blank chunk {} of {}", record.position, record.source_id)));
        }
        self.records.push(record);
        Ok(self.records.len() - 1)
    }

    pub fn dim(&self) -> usize { self.dim }

    pub fn len(&self) -> usize { self.records.len() }

    pub fn is_empty(&self) -> bool { self.records.is_empty() }

    pub fn get(&self, position: usize) -> Option<&ChunkRecord> { self.records.get(position) }

    pub fn records(&self) -> &[ChunkRecord] { &self.records }

    /// Vectors in store order, for bulk index construction.
    pub fn vectors(&self) -> impl Iterator<Item = &[f32]> + '_ {
        self.records.iter().map(|r| r.vector.as_slice())
    }

    /// Number of distinct source documents with at least one chunk.
    pub fn source_count(&self) -> usize {
        self.records.iter().map(|r| r.source_id.as_str()).collect::<BTreeSet<_>>().len()
    }
}
