//! kbsearch-ingest
//!
//! Turns a documents folder (or in-memory texts) into a [`CorpusStore`]:
//! extract, chunk, embed, append. Failures are isolated per document and per
//! chunk and reported through [`IngestReport`].

pub mod extract;
pub mod pipeline;
pub mod source;
pub mod store;

pub use extract::{ExtractorRegistry, PdfExtractor, PlainTextExtractor};
pub use pipeline::{build, ChunkFailure, CorpusBuilder, DocumentOutcome, DocumentReport, IngestReport, SkipReason};
pub use source::DirectorySource;
pub use store::CorpusStore;
