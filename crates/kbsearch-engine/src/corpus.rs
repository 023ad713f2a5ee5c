use kbsearch_core::types::ChunkRecord;
use kbsearch_core::Result;
use kbsearch_ingest::CorpusStore;
use kbsearch_vector::FlatIndex;

/// An immutable snapshot of the chunk store and the index built over it.
///
/// Index row `i` is the vector of store record `i`; both are built together
/// here and neither can change afterwards. A different corpus means a new
/// `Corpus` value.
#[derive(Debug)]
pub struct Corpus {
    store: CorpusStore,
    index: FlatIndex,
}

impl Corpus {
    pub fn build(store: CorpusStore) -> Result<Self> {
        let index = FlatIndex::build(store.vectors(), store.dim())?;
        if store.is_empty() {
            tracing::warn!("no documents loaded; index is empty");
        } else {
            tracing::info!(vectors = index.len(), dim = index.dim(), "vector index created");
        }
        Ok(Self { store, index })
    }

    pub fn store(&self) -> &CorpusStore { &self.store }

    pub fn index(&self) -> &FlatIndex { &self.index }

    pub fn len(&self) -> usize { self.store.len() }

    pub fn is_empty(&self) -> bool { self.store.is_empty() }

    pub fn dim(&self) -> usize { self.index.dim() }

    pub fn get(&self, position: usize) -> Option<&ChunkRecord> { self.store.get(position) }
}
