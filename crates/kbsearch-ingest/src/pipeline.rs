use std::fmt;

use indicatif::{ProgressBar, ProgressStyle};
use kbsearch_core::chunker::Chunker;
use kbsearch_core::traits::Embedder;
use kbsearch_core::types::ChunkRecord;
use kbsearch_core::Error;

use crate::extract::ExtractorRegistry;
use crate::source::DirectorySource;
use crate::store::CorpusStore;

/// Why a whole document contributed nothing to the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Unsupported { extension: String },
    Extraction(String),
    EmptyText,
    /// Chunks were cut but none of them could be embedded.
    Embedding(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Unsupported { extension } if extension.is_empty() => write!(f, "unsupported file type"),
            SkipReason::Unsupported { extension } => write!(f, "unsupported file type .{extension}"),
            SkipReason::Extraction(reason) => write!(f, "text extraction failed: {reason}"),
            SkipReason::EmptyText => write!(f, "no text extracted"),
            SkipReason::Embedding(reason) => write!(f, "no chunk could be embedded: {reason}"),
        }
    }
}

/// A chunk that was cut from a document but could not be embedded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFailure {
    pub position: usize,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOutcome {
    Indexed { chunks: usize, failed_chunks: Vec<ChunkFailure> },
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReport {
    pub source_id: String,
    pub outcome: DocumentOutcome,
}

/// Per-document outcomes of one build, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub documents: Vec<DocumentReport>,
}

impl IngestReport {
    pub fn indexed_documents(&self) -> usize {
        self.documents.iter().filter(|d| matches!(d.outcome, DocumentOutcome::Indexed { .. })).count()
    }

    pub fn skipped_documents(&self) -> usize { self.documents.len() - self.indexed_documents() }

    pub fn total_chunks(&self) -> usize {
        self.documents
            .iter()
            .map(|d| match &d.outcome { DocumentOutcome::Indexed { chunks, .. } => *chunks, DocumentOutcome::Skipped(_) => 0 })
            .sum()
    }

    pub fn failed_chunks(&self) -> usize {
        self.documents
            .iter()
            .map(|d| match &d.outcome { DocumentOutcome::Indexed { failed_chunks, .. } => failed_chunks.len(), DocumentOutcome::Skipped(_) => 0 })
            .sum()
    }

    pub fn outcome_of(&self, source_id: &str) -> Option<&DocumentOutcome> {
        self.documents.iter().find(|d| d.source_id == source_id).map(|d| &d.outcome)
    }
}

/// Single-use build of a [`CorpusStore`]: chunk, embed and append each
/// document in input order. A failing document or chunk is recorded in the
/// report and skipped; the build itself never fails.
pub struct CorpusBuilder<'a> {
    chunker: Chunker,
    embedder: &'a dyn Embedder,
    store: CorpusStore,
    report: IngestReport,
    progress: ProgressBar,
}

impl<'a> CorpusBuilder<'a> {
    pub fn new(chunker: Chunker, embedder: &'a dyn Embedder) -> Self {
        Self {
            chunker,
            embedder,
            store: CorpusStore::new(embedder.dim()),
            report: IngestReport::default(),
            progress: ProgressBar::hidden(),
        }
    }

    /// Shows an embedding progress bar on stderr.
    pub fn with_progress(mut self) -> Self {
        let pb = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        self.progress = pb;
        self
    }

    pub fn ingest_text(&mut self, source_id: &str, raw_text: &str) -> &DocumentOutcome {
        let outcome = self.process_text(source_id, raw_text);
        self.record(source_id, outcome)
    }

    /// Walks `source`, extracting each supported file through `registry`.
    pub fn ingest_directory(&mut self, source: &DirectorySource, registry: &ExtractorRegistry) -> &mut Self {
        tracing::info!(dir = %source.root().display(), "loading documents");
        for path in source.files() {
            let source_id = source.source_id(&path);
            let Some(extractor) = registry.for_path(&path) else {
                let extension = path.extension().map(|e| e.to_string_lossy().to_string()).unwrap_or_default();
                tracing::info!(source = %source_id, "skipping unsupported file");
                self.record(&source_id, DocumentOutcome::Skipped(SkipReason::Unsupported { extension }));
                continue;
            };
            let text = std::fs::read(&path)
                .map_err(anyhow::Error::from)
                .and_then(|bytes| extractor.extract(&bytes));
            match text {
                Ok(text) => {
                    self.ingest_text(&source_id, &text);
                }
                Err(e) => {
                    let err = Error::Extraction { source_id: source_id.clone(), reason: e.to_string() };
                    tracing::error!("{err}");
                    self.record(&source_id, DocumentOutcome::Skipped(SkipReason::Extraction(e.to_string())));
                }
            }
        }
        self
    }

    pub fn finish(self) -> (CorpusStore, IngestReport) {
        self.progress.finish_and_clear();
        tracing::info!(
            documents = self.report.indexed_documents(),
            skipped = self.report.skipped_documents(),
            chunks = self.store.len(),
            failed_chunks = self.report.failed_chunks(),
            "corpus built"
        );
        (self.store, self.report)
    }

    fn process_text(&mut self, source_id: &str, raw_text: &str) -> DocumentOutcome {
        if raw_text.trim().is_empty() {
            tracing::warn!(source = %source_id, "no text extracted; skipping");
            return DocumentOutcome::Skipped(SkipReason::EmptyText);
        }
        let chunks = self.chunker.chunk(raw_text);
        self.progress.inc_length(chunks.len() as u64);
        self.progress.set_message(source_id.to_string());

        let mut indexed = 0usize;
        let mut failed_chunks = Vec::new();
        for (position, text) in chunks.into_iter().enumerate() {
            let result = self
                .embed_chunk(&text)
                .and_then(|vector| {
                    self.store.append(ChunkRecord { text, vector, source_id: source_id.to_string(), position })
                });
            match result {
                Ok(_) => indexed += 1,
                Err(e) => {
                    tracing::error!(source = %source_id, position, "failed to embed chunk: {e}");
                    failed_chunks.push(ChunkFailure { position, reason: e.to_string() });
                }
            }
            self.progress.inc(1);
        }
        if indexed == 0 {
            let reason = failed_chunks.first().map(|f| f.reason.clone()).unwrap_or_default();
            tracing::warn!(source = %source_id, failed = failed_chunks.len(), "no chunk embedded; skipping document");
            return DocumentOutcome::Skipped(SkipReason::Embedding(reason));
        }
        tracing::info!(source = %source_id, chunks = indexed, "document chunked");
        DocumentOutcome::Indexed { chunks: indexed, failed_chunks }
    }

    fn embed_chunk(&self, text: &str) -> kbsearch_core::Result<Vec<f32>> {
        let vector = self.embedder.embed(text).map_err(|e| Error::Embedding(e.to_string()))?;
        if vector.len() != self.embedder.dim() {
            return Err(Error::Embedding(format!(
                "expected {} floats, embedder returned {}",
                self.embedder.dim(),
                vector.len()
            )));
        }
        Ok(vector)
    }

    fn record(&mut self, source_id: &str, outcome: DocumentOutcome) -> &DocumentOutcome {
        self.report.documents.push(DocumentReport { source_id: source_id.to_string(), outcome });
        let last = self.report.documents.len() - 1;
        &self.report.documents[last].outcome
    }
}

/// Builds a store from already extracted `(source_id, raw_text)` pairs.
pub fn build<I, S, T>(documents: I, chunker: Chunker, embedder: &dyn Embedder) -> (CorpusStore, IngestReport)
where
    I: IntoIterator<Item = (S, T)>,
    S: AsRef<str>,
    T: AsRef<str>,
{
    let mut builder = CorpusBuilder::new(chunker, embedder);
    for (source_id, raw_text) in documents {
        builder.ingest_text(source_id.as_ref(), raw_text.as_ref());
    }
    builder.finish()
}
