use kbsearch_core::traits::Embedder;
use kbsearch_core::types::QueryResult;
use kbsearch_core::{Error, Result};

use crate::corpus::Corpus;

/// Read-only query path over a [`Corpus`].
///
/// `embedder` must be the one the corpus was built with.
pub struct Retriever<'a> {
    corpus: &'a Corpus,
    embedder: &'a dyn Embedder,
}

impl<'a> Retriever<'a> {
    pub fn new(corpus: &'a Corpus, embedder: &'a dyn Embedder) -> Self { Self { corpus, embedder } }

    /// Top `top_k` chunks, nearest first. An empty corpus yields no results
    /// without calling the embedder.
    pub fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<QueryResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidInput("query must not be empty".to_string()));
        }
        if top_k == 0 {
            return Err(Error::InvalidInput("top_k must be at least 1".to_string()));
        }
        if self.corpus.is_empty() {
            tracing::warn!("no documents loaded in the system");
            return Ok(Vec::new());
        }

        let query_vec = self.embedder.embed(query).map_err(|e| Error::Embedding(e.to_string()))?;
        let neighbors = self.corpus.index().search(&query_vec, top_k)?;
        let results = neighbors
            .into_iter()
            .map(|n| {
                self.corpus
                    .get(n.position)
                    .map(|record| QueryResult::new(record.clone(), n.distance))
                    .ok_or_else(|| Error::Operation(format!("index position {} has no record", n.position)))
            })
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!(top_k, hits = results.len(), "retrieved");
        Ok(results)
    }
}
