//! kbsearch-engine
//!
//! Query side of the service: a [`Corpus`] snapshot, the [`Retriever`] over
//! it and the [`SearchEngine`] facade that adds answer synthesis and stats.

use std::sync::Arc;

use kbsearch_core::config::Settings;
use kbsearch_core::traits::{Embedder, Synthesizer};
use kbsearch_core::types::{QueryResult, Stats};
use kbsearch_core::{Error, Result};
use kbsearch_embed::load_embedder;
use kbsearch_ingest::{CorpusBuilder, DirectorySource, ExtractorRegistry, IngestReport};
use serde::{Deserialize, Serialize};

pub mod corpus;
pub mod retriever;
pub mod synth;

pub use corpus::Corpus;
pub use retriever::Retriever;
pub use synth::{ContextSynthesizer, NO_CONTEXT_ANSWER};

pub const EMPTY_CORPUS_NOTE: &str = "No documents are loaded; add .txt or .pdf files to the documents folder and restart.";

/// Where a ranked chunk came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub file: String,
    pub chunk: usize,
    pub similarity: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchAnswer {
    pub query: String,
    pub answer: String,
    pub sources: Vec<SourceRef>,
    /// Number of chunks the query was matched against.
    pub num_docs_searched: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Shareable query facade. Cloning is cheap; every clone reads the same
/// corpus snapshot.
#[derive(Clone)]
pub struct SearchEngine {
    corpus: Arc<Corpus>,
    embedder: Arc<dyn Embedder>,
    synthesizer: Arc<dyn Synthesizer>,
    max_top_k: Option<usize>,
}

impl SearchEngine {
    pub fn new(corpus: Arc<Corpus>, embedder: Arc<dyn Embedder>) -> Self {
        Self { corpus, embedder, synthesizer: Arc::new(ContextSynthesizer), max_top_k: None }
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn Synthesizer>) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    /// Caps `top_k` for [`SearchEngine::search`]; larger requests are clamped.
    pub fn with_max_top_k(mut self, max_top_k: usize) -> Self {
        self.max_top_k = Some(max_top_k);
        self
    }

    pub fn corpus(&self) -> &Arc<Corpus> { &self.corpus }

    pub fn retriever(&self) -> Retriever<'_> { Retriever::new(&self.corpus, self.embedder.as_ref()) }

    pub fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<QueryResult>> {
        self.retriever().retrieve(query, top_k)
    }

    /// Retrieves and synthesizes an answer from the ranked chunks.
    pub fn search(&self, query: &str, top_k: usize) -> Result<SearchAnswer> {
        let top_k = match self.max_top_k {
            Some(max) if top_k > max => {
                tracing::debug!(requested = top_k, max, "clamping top_k");
                max
            }
            _ => top_k,
        };
        tracing::info!(query, top_k, "search");
        let results = self.retrieve(query, top_k)?;
        let chunks: Vec<&str> = results.iter().map(|r| r.chunk.text.as_str()).collect();
        let answer = self
            .synthesizer
            .synthesize(query, &chunks)
            .map_err(|e| Error::Operation(format!("answer synthesis failed: {e}")))?;
        let sources = results
            .iter()
            .map(|r| SourceRef { file: r.chunk.source_id.clone(), chunk: r.chunk.position, similarity: r.similarity })
            .collect();
        let note = self.corpus.is_empty().then(|| EMPTY_CORPUS_NOTE.to_string());
        Ok(SearchAnswer { query: query.to_string(), answer, sources, num_docs_searched: self.corpus.len(), note })
    }

    pub fn stats(&self) -> Stats {
        Stats {
            total_chunks: self.corpus.len(),
            total_documents: self.corpus.store().source_count(),
            index_size: self.corpus.index().len(),
            embedding_dimension: self.corpus.dim(),
            model: self.embedder.id().to_string(),
        }
    }
}

/// Startup routine: loads the embedder, ingests `data.docs_dir` and builds the
/// corpus snapshot. Runs to completion before any query is served.
pub fn build_engine(settings: &Settings) -> anyhow::Result<(SearchEngine, IngestReport)> {
    settings.validate()?;
    let chunker = settings.chunking.chunker()?;
    let embedder = load_embedder(&settings.embedding)?;
    let mut builder = CorpusBuilder::new(chunker, embedder.as_ref()).with_progress();
    builder.ingest_directory(&DirectorySource::new(settings.data.docs_dir()), &ExtractorRegistry::default());
    let (store, report) = builder.finish();
    let corpus = Arc::new(Corpus::build(store)?);
    let engine = SearchEngine::new(corpus, embedder).with_max_top_k(settings.retrieval.max_top_k);
    Ok((engine, report))
}
