use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use kbsearch_core::chunker::Chunker;
use kbsearch_core::config::{Config, Settings};
use kbsearch_engine::{build_engine, SearchEngine};
use kbsearch_ingest::{ExtractorRegistry, IngestReport};
use kbsearch_server::{serve, AppState};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kbsearch")]
#[command(about = "Semantic search over a folder of text and PDF documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest the documents folder and start the HTTP server
    Serve {
        /// Host to bind to (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Server port (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Documents folder (overrides data.docs_dir)
        #[arg(short, long)]
        docs: Option<String>,
    },

    /// Ingest the documents folder and answer one query
    Query {
        /// Natural-language query
        text: String,

        /// Number of chunks to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Documents folder (overrides data.docs_dir)
        #[arg(short, long)]
        docs: Option<String>,
    },

    /// Ingest the documents folder and print corpus statistics
    Stats {
        /// Documents folder (overrides data.docs_dir)
        #[arg(short, long)]
        docs: Option<String>,
    },

    /// Print how a single file would be chunked
    Chunk {
        /// A .txt or .pdf file
        file: PathBuf,

        #[arg(long)]
        chunk_size: Option<usize>,

        #[arg(long)]
        overlap: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let config = Config::load().map_err(|e| {
        tracing::error!("error loading config: {e}");
        e
    })?;
    let mut settings = config.settings()?;

    match cli.command {
        Commands::Serve { host, port, docs } => {
            if let Some(host) = host { settings.server.host = host; }
            if let Some(port) = port { settings.server.port = port; }
            override_docs(&mut settings, docs);
            let addr = resolve_addr(&settings.server.host, settings.server.port)?;
            let default_top_k = settings.retrieval.default_top_k;

            let engine = start_engine(settings).await?;
            serve(Arc::new(AppState::new(engine, default_top_k)), addr).await?;
        }
        Commands::Query { text, top_k, docs } => {
            override_docs(&mut settings, docs);
            let top_k = top_k.unwrap_or(settings.retrieval.default_top_k);
            let engine = start_engine(settings).await?;
            let answer = tokio::task::spawn_blocking(move || engine.search(&text, top_k)).await??;

            println!("{}", answer.answer);
            if let Some(note) = &answer.note { println!("\nNote: {note}"); }
            println!("\nSources ({} chunks searched):", answer.num_docs_searched);
            for (rank, source) in answer.sources.iter().enumerate() {
                println!("  {}. {} #{} (similarity {:.4})", rank + 1, source.file, source.chunk, source.similarity);
            }
        }
        Commands::Stats { docs } => {
            override_docs(&mut settings, docs);
            let stats = start_engine(settings).await?.stats();
            println!("Total chunks:        {}", stats.total_chunks);
            println!("Total documents:     {}", stats.total_documents);
            println!("Index size:          {}", stats.index_size);
            println!("Embedding dimension: {}", stats.embedding_dimension);
            println!("Model:               {}", stats.model);
        }
        Commands::Chunk { file, chunk_size, overlap } => {
            let chunker = Chunker::new(
                chunk_size.unwrap_or(settings.chunking.chunk_size),
                overlap.unwrap_or(settings.chunking.overlap),
            )?;
            let registry = ExtractorRegistry::default();
            let extractor = registry
                .for_path(&file)
                .ok_or_else(|| anyhow!("unsupported file type: {}", file.display()))?;
            let bytes = std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
            let text = extractor.extract(&bytes)?;
            let word_count = text.split_whitespace().count();
            let starts = chunker.window_starts(word_count);

            println!("{}: {} words, {} chunks (size {}, overlap {})", file.display(), word_count, starts.len(), chunker.chunk_size(), chunker.overlap());
            println!("window starts: {starts:?}");
        }
    }

    Ok(())
}

fn override_docs(settings: &mut Settings, docs: Option<String>) {
    if let Some(docs) = docs { settings.data.docs_dir = docs; }
}

fn resolve_addr(host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .with_context(|| format!("resolving {host}:{port}"))?
        .next()
        .ok_or_else(|| anyhow!("no address for {host}:{port}"))
}

/// Ingestion is CPU-bound model work, so it runs on the blocking pool.
async fn start_engine(settings: Settings) -> anyhow::Result<SearchEngine> {
    let (engine, report) = tokio::task::spawn_blocking(move || build_engine(&settings)).await??;
    log_report(&report);
    Ok(engine)
}

fn log_report(report: &IngestReport) {
    for doc in &report.documents {
        tracing::debug!(source = %doc.source_id, outcome = ?doc.outcome, "ingest outcome");
    }
    if report.indexed_documents() == 0 {
        tracing::warn!("no documents indexed; queries will return empty results");
    }
}
