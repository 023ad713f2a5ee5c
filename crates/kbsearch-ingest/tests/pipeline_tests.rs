use std::fs;

use anyhow::{bail, Result};
use kbsearch_core::chunker::Chunker;
use kbsearch_core::traits::Embedder;
use kbsearch_embed::HashEmbedder;
use kbsearch_ingest::{build, CorpusBuilder, DirectorySource, DocumentOutcome, ExtractorRegistry, SkipReason};
use tempfile::TempDir;

/// Hash embedder that refuses any text containing `POISON`.
struct PickyEmbedder(HashEmbedder);

impl Embedder for PickyEmbedder {
    fn id(&self) -> &str { "picky" }
    fn dim(&self) -> usize { self.0.dim() }
    fn max_len(&self) -> usize { usize::MAX }
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.contains("POISON") { bail!("model refused input"); }
        self.0.embed(text)
    }
}

/// Returns vectors one float short of its advertised dimension.
struct ShortEmbedder;

impl Embedder for ShortEmbedder {
    fn id(&self) -> &str { "short" }
    fn dim(&self) -> usize { 8 }
    fn max_len(&self) -> usize { usize::MAX }
    fn embed(&self, _text: &str) -> Result<Vec<f32>> { Ok(vec![0.5; 7]) }
}

fn words(prefix: &str, n: usize) -> String {
    (0..n).map(|i| format!("{prefix}{i}")).collect::<Vec<_>>().join(" ")
}

#[test]
fn build_assigns_positions_per_source() {
    let embedder = HashEmbedder::new(32);
    let docs = vec![("a.txt", words("a", 1000)), ("b.txt", "HTTP is a protocol".to_string())];
    let (store, report) = build(docs, Chunker::default(), &embedder);

    assert_eq!(store.len(), 4, "3 windows for 1000 words + 1 short doc");
    let layout: Vec<(&str, usize)> = store.records().iter().map(|r| (r.source_id.as_str(), r.position)).collect();
    assert_eq!(layout, vec![("a.txt", 0), ("a.txt", 1), ("a.txt", 2), ("b.txt", 0)]);
    assert!(store.records()[1].text.starts_with("a400 "));
    assert_eq!(report.indexed_documents(), 2);
    assert_eq!(report.total_chunks(), 4);
    assert_eq!(store.source_count(), 2);
}

#[test]
fn failing_chunk_is_skipped_and_build_continues() {
    let embedder = PickyEmbedder(HashEmbedder::new(16));
    let chunker = Chunker::new(4, 1).expect("chunker");
    // windows: [0..4) [3..7) [6..9); the middle one carries the poison word
    let text = "w0 w1 w2 w3 w4 POISON w6 w7 w8";
    let docs = vec![("bad.txt", text), ("good.txt", "fine words here")];
    let (store, report) = build(docs, chunker, &embedder);

    let positions: Vec<(String, usize)> = store.records().iter().map(|r| (r.source_id.clone(), r.position)).collect();
    assert_eq!(
        positions,
        vec![("bad.txt".to_string(), 0), ("bad.txt".to_string(), 2), ("good.txt".to_string(), 0)],
        "surviving chunks keep their original position"
    );
    match report.outcome_of("bad.txt") {
        Some(DocumentOutcome::Indexed { chunks, failed_chunks }) => {
            assert_eq!(*chunks, 2);
            assert_eq!(failed_chunks.iter().map(|f| f.position).collect::<Vec<_>>(), vec![1]);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(report.failed_chunks(), 1);
}

/// Fails every call, like a model that never loaded its weights.
struct BrokenEmbedder;

impl Embedder for BrokenEmbedder {
    fn id(&self) -> &str { "broken" }
    fn dim(&self) -> usize { 8 }
    fn max_len(&self) -> usize { usize::MAX }
    fn embed(&self, _text: &str) -> Result<Vec<f32>> { bail!("weights not loaded") }
}

#[test]
fn document_with_no_embedded_chunk_is_skipped() {
    let docs = vec![("a.txt", "one two three"), ("b.txt", "four five")];
    let (store, report) = build(docs, Chunker::default(), &BrokenEmbedder);
    assert!(store.is_empty());
    assert_eq!(report.indexed_documents(), 0);
    assert_eq!(report.skipped_documents(), 2);
    match report.outcome_of("a.txt") {
        Some(DocumentOutcome::Skipped(SkipReason::Embedding(reason))) => assert!(reason.contains("weights not loaded")),
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn wrong_width_vectors_never_reach_the_store() {
    let (store, report) = build(vec![("a.txt", "some text")], Chunker::default(), &ShortEmbedder);
    assert!(store.is_empty());
    assert!(matches!(report.outcome_of("a.txt"), Some(DocumentOutcome::Skipped(SkipReason::Embedding(_)))));
}

#[test]
fn blank_document_is_skipped() {
    let embedder = HashEmbedder::new(8);
    let (store, report) = build(vec![("blank.txt", "  \n\t ")], Chunker::default(), &embedder);
    assert!(store.is_empty());
    assert_eq!(report.outcome_of("blank.txt"), Some(&DocumentOutcome::Skipped(SkipReason::EmptyText)));
}

#[test]
fn directory_ingest_routes_by_extension() {
    let tmp = TempDir::new().expect("tmp");
    let dir = tmp.path();
    fs::write(dir.join("http.txt"), "HTTP is a protocol for transferring hypertext").expect("write");
    fs::create_dir(dir.join("db")).expect("mkdir");
    fs::write(dir.join("db").join("keys.txt"), "Primary keys uniquely identify rows").expect("write");
    fs::write(dir.join("slides.pptx"), "binary").expect("write");
    fs::write(dir.join("broken.pdf"), "not really a pdf").expect("write");
    fs::write(dir.join("empty.txt"), "").expect("write");

    let embedder = HashEmbedder::new(32);
    let mut builder = CorpusBuilder::new(Chunker::default(), &embedder);
    builder.ingest_directory(&DirectorySource::new(dir), &ExtractorRegistry::default());
    let (store, report) = builder.finish();

    let sources: Vec<&str> = store.records().iter().map(|r| r.source_id.as_str()).collect();
    assert_eq!(sources, vec!["db/keys.txt", "http.txt"], "sorted walk order");
    assert_eq!(report.documents.len(), 5);
    assert!(matches!(report.outcome_of("slides.pptx"), Some(DocumentOutcome::Skipped(SkipReason::Unsupported { .. }))));
    assert!(matches!(report.outcome_of("broken.pdf"), Some(DocumentOutcome::Skipped(SkipReason::Extraction(_)))));
    assert_eq!(report.outcome_of("empty.txt"), Some(&DocumentOutcome::Skipped(SkipReason::EmptyText)));
}

#[test]
fn missing_directory_gives_empty_store() {
    let tmp = TempDir::new().expect("tmp");
    let embedder = HashEmbedder::new(8);
    let mut builder = CorpusBuilder::new(Chunker::default(), &embedder);
    builder.ingest_directory(&DirectorySource::new(tmp.path().join("nope")), &ExtractorRegistry::default());
    let (store, report) = builder.finish();
    assert!(store.is_empty());
    assert!(report.documents.is_empty());
}
