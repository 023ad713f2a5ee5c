use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use kbsearch_core::chunker::Chunker;
use kbsearch_core::config::{EmbeddingBackend, Settings};
use kbsearch_core::traits::Embedder;
use kbsearch_core::Error;
use kbsearch_embed::HashEmbedder;
use kbsearch_engine::{build_engine, Corpus, Retriever, SearchEngine, EMPTY_CORPUS_NOTE, NO_CONTEXT_ANSWER};
use kbsearch_ingest::build;
use tempfile::TempDir;

/// Counts calls so tests can assert the embedder was never consulted.
struct CountingEmbedder {
    inner: HashEmbedder,
    calls: AtomicUsize,
}

impl CountingEmbedder {
    fn new(dim: usize) -> Self { Self { inner: HashEmbedder::new(dim), calls: AtomicUsize::new(0) } }
}

impl Embedder for CountingEmbedder {
    fn id(&self) -> &str { "counting" }
    fn dim(&self) -> usize { self.inner.dim() }
    fn max_len(&self) -> usize { usize::MAX }
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.embed(text)
    }
}

const HTTP: &str = "HTTP is a protocol for transferring hypertext between clients and servers.";
const KEYS: &str = "Primary keys uniquely identify each row in a relational table.";

fn two_doc_engine() -> SearchEngine {
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(384));
    let (store, _) = build(vec![("http.txt", HTTP), ("db.txt", KEYS)], Chunker::default(), embedder.as_ref());
    let corpus = Corpus::build(store).expect("corpus");
    SearchEngine::new(Arc::new(corpus), embedder)
}

#[test]
fn http_question_ranks_http_chunk_first() {
    let engine = two_doc_engine();
    let answer = engine.search("What is HTTP?", 1).expect("search");
    assert_eq!(answer.num_docs_searched, 2);
    assert_eq!(answer.sources.len(), 1);
    assert_eq!(answer.sources[0].file, "http.txt");
    assert_eq!(answer.sources[0].chunk, 0);
    let s = answer.sources[0].similarity;
    assert!(s > 0.0 && s <= 1.0, "similarity {s}");
    assert!(answer.answer.contains("HTTP is a protocol"));
    assert!(answer.note.is_none());
}

#[test]
fn results_are_sorted_and_similarity_matches_distance() {
    let engine = two_doc_engine();
    let results = engine.retrieve("Explain primary key", 2).expect("retrieve");
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].chunk.source_id, "db.txt");
    for pair in results.windows(2) { assert!(pair[0].distance <= pair[1].distance); }
    for r in &results {
        assert!(r.distance >= 0.0);
        assert!((r.similarity - 1.0 / (1.0 + r.distance)).abs() < 1e-6);
    }
}

#[test]
fn top_k_saturates_at_corpus_size() {
    let engine = two_doc_engine();
    assert_eq!(engine.retrieve("anything at all", 10).expect("retrieve").len(), 2);
}

#[test]
fn identical_queries_give_identical_rankings() {
    let engine = two_doc_engine();
    let a = engine.retrieve("relational rows", 2).expect("a");
    let b = engine.retrieve("relational rows", 2).expect("b");
    assert_eq!(a, b);
}

#[test]
fn bad_requests_are_invalid_input() {
    let engine = two_doc_engine();
    assert!(matches!(engine.retrieve("   ", 3), Err(Error::InvalidInput(_))));
    assert!(matches!(engine.retrieve("", 3), Err(Error::InvalidInput(_))));
    assert!(matches!(engine.retrieve("http", 0), Err(Error::InvalidInput(_))));
    assert!(engine.search("", 3).err().is_some_and(|e| e.is_client_error()));
}

#[test]
fn empty_corpus_short_circuits_without_embedding() {
    let embedder = CountingEmbedder::new(16);
    let (store, _) = build(Vec::<(&str, &str)>::new(), Chunker::default(), &embedder);
    let corpus = Corpus::build(store).expect("corpus");
    let retriever = Retriever::new(&corpus, &embedder);
    assert!(retriever.retrieve("anything", 3).expect("retrieve").is_empty());
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn empty_corpus_answer_carries_note() {
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(16));
    let (store, _) = build(Vec::<(&str, &str)>::new(), Chunker::default(), embedder.as_ref());
    let engine = SearchEngine::new(Arc::new(Corpus::build(store).expect("corpus")), embedder);
    let answer = engine.search("anything", 3).expect("search");
    assert!(answer.sources.is_empty());
    assert_eq!(answer.answer, NO_CONTEXT_ANSWER);
    assert_eq!(answer.num_docs_searched, 0);
    assert_eq!(answer.note.as_deref(), Some(EMPTY_CORPUS_NOTE));
}

#[test]
fn index_rows_line_up_with_store_records() {
    let engine = two_doc_engine();
    let corpus = engine.corpus();
    assert_eq!(corpus.index().len(), corpus.store().len());
    for (i, record) in corpus.store().records().iter().enumerate() {
        assert_eq!(corpus.index().vector(i), Some(record.vector.as_slice()));
    }
}

#[test]
fn max_top_k_clamps_search_requests() {
    let engine = two_doc_engine().with_max_top_k(1);
    assert_eq!(engine.search("HTTP keys", 50).expect("search").sources.len(), 1);
}

#[test]
fn stats_describe_the_snapshot() {
    let stats = two_doc_engine().stats();
    assert_eq!(stats.total_chunks, 2);
    assert_eq!(stats.total_documents, 2);
    assert_eq!(stats.index_size, 2);
    assert_eq!(stats.embedding_dimension, 384);
    assert_eq!(stats.model, "hash:xxh64:d384");
}

#[test]
fn concurrent_queries_share_one_snapshot() {
    let engine = two_doc_engine();
    let expected = engine.retrieve("What is HTTP?", 2).expect("baseline");
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = engine.clone();
            std::thread::spawn(move || engine.retrieve("What is HTTP?", 2).expect("retrieve"))
        })
        .collect();
    for h in handles { assert_eq!(h.join().expect("join"), expected); }
}

#[test]
fn build_engine_ingests_docs_dir() {
    let tmp = TempDir::new().expect("tmp");
    fs::write(tmp.path().join("http.txt"), HTTP).expect("write");
    fs::write(tmp.path().join("notes.md"), "ignored").expect("write");
    let mut settings = Settings::default();
    settings.data.docs_dir = tmp.path().to_string_lossy().to_string();
    settings.embedding.backend = EmbeddingBackend::Hash;

    let (engine, report) = build_engine(&settings).expect("engine");
    assert_eq!(report.indexed_documents(), 1);
    assert_eq!(report.skipped_documents(), 1);
    assert_eq!(engine.stats().total_chunks, 1);
    let json = serde_json::to_value(engine.search("HTTP", 3).expect("search")).expect("json");
    assert_eq!(json["num_docs_searched"], 1);
    assert!(json.get("note").is_none());
}

#[test]
fn build_engine_rejects_bad_chunking() {
    let mut settings = Settings::default();
    settings.embedding.backend = EmbeddingBackend::Hash;
    settings.chunking.overlap = settings.chunking.chunk_size;
    let err = build_engine(&settings).err().expect("config error");
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Configuration(_))));
}
