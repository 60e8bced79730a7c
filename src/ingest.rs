//! Ingestion pipeline orchestration.
//!
//! Coordinates the full run: corpus load → chunking → embedding → index
//! build. Stages execute synchronously in order; the only concurrency in
//! play is the embedding service's thread-safe lazy initialization.
//!
//! A run with zero usable documents (or zero chunks) is a successful no-op:
//! it logs a warning, writes nothing, and leaves any previous index
//! untouched. An unrecoverable stage error aborts the run before anything
//! reaches the destination — partial output is discarded with the staging
//! directory, never published.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::chunk;
use crate::config::Config;
use crate::embedding::EmbeddingService;
use crate::index::FlatIndex;
use crate::loader;

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Nothing to do: zero documents or zero chunks. No artifacts written.
    Empty,
    /// Counts reported without embedding or writing.
    DryRun { documents: usize, chunks: usize },
    /// Index built and published.
    Built {
        documents: usize,
        chunks: usize,
        dim: usize,
    },
}

/// Run the ingestion pipeline end to end.
pub async fn run_ingest(
    config: &Config,
    service: Arc<EmbeddingService>,
    dry_run: bool,
) -> Result<IngestOutcome> {
    tracing::info!(dir = %config.corpus.dir.display(), "loading corpus");
    let documents = loader::load_corpus(&config.corpus)?;

    if documents.is_empty() {
        tracing::warn!("no documents to ingest; existing index left untouched");
        println!("ingest");
        println!("  documents: 0");
        println!("  nothing to do");
        return Ok(IngestOutcome::Empty);
    }

    let chunks = chunk::chunk_documents(&documents, &config.chunking);
    if chunks.is_empty() {
        tracing::warn!("documents produced no chunks; existing index left untouched");
        println!("ingest");
        println!("  documents: {}", documents.len());
        println!("  chunks: 0");
        println!("  nothing to do");
        return Ok(IngestOutcome::Empty);
    }

    if dry_run {
        println!("ingest (dry-run)");
        println!("  documents: {}", documents.len());
        println!("  chunks: {}", chunks.len());
        return Ok(IngestOutcome::DryRun {
            documents: documents.len(),
            chunks: chunks.len(),
        });
    }

    tracing::info!(
        chunks = chunks.len(),
        model = %service.model_name(),
        "generating embeddings"
    );
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let svc = service.clone();
    let embeddings = tokio::task::spawn_blocking(move || svc.embed_texts(&texts))
        .await
        .context("embedding task panicked")??;

    tracing::info!(count = embeddings.len(), "building index");
    let index = FlatIndex::build(&chunks, &embeddings)?;
    let manifest = index.persist(&config.index.dir, service.model_name())?;

    println!("ingest");
    println!("  documents: {}", documents.len());
    println!("  chunks: {}", chunks.len());
    println!("  dimension: {}", manifest.dim);
    println!("  index: {}", config.index.dir.display());
    println!("ok");

    Ok(IngestOutcome::Built {
        documents: documents.len(),
        chunks: chunks.len(),
        dim: manifest.dim,
    })
}
