//! # lexindex CLI (`lexidx`)
//!
//! The `lexidx` binary drives the ingestion-to-index pipeline and offers a
//! query front-end for inspection.
//!
//! ## Usage
//!
//! ```bash
//! lexidx --config ./config/lexidx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lexidx ingest` | Load the corpus, chunk, embed, and publish the index |
//! | `lexidx search "<query>"` | Embed a query and print the nearest passages |
//! | `lexidx stats` | Summarize the persisted index |
//!
//! ## Examples
//!
//! ```bash
//! # Full rebuild of the index from the configured corpus directory
//! lexidx ingest --config ./config/lexidx.toml
//!
//! # Count documents and chunks without embedding or writing
//! lexidx ingest --dry-run
//!
//! # Query the index
//! lexidx search "punishment for culpable homicide" --k 3
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lexindex::embedding::EmbeddingService;
use lexindex::{config, ingest, search, stats};

/// lexindex — a local-first ingestion and vector-index pipeline for legal
/// document retrieval.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file holding the corpus directory, index destination, chunking sizes, and
/// embedding provider settings.
#[derive(Parser)]
#[command(
    name = "lexidx",
    about = "lexindex — ingest legal documents into a searchable vector index",
    version,
    long_about = "lexindex loads a directory of legal documents (PDF, DOCX, plain text), \
    splits them into overlapping passages with filename-derived provenance metadata, \
    embeds each passage, and publishes an exact-search vector index for a downstream \
    question-answering service."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/lexidx.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Run the ingestion pipeline: load → chunk → embed → index.
    ///
    /// Rebuilds the index wholesale and publishes it atomically; a previous
    /// index stays readable until the new one is in place. An empty corpus
    /// is a successful no-op.
    Ingest {
        /// Show document and chunk counts without embedding or writing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Search the persisted index.
    ///
    /// Embeds the query with the configured model and prints the nearest
    /// passages with their provenance metadata, closest first.
    Search {
        /// The query text.
        query: String,

        /// Maximum number of results (defaults to retrieval.top_k).
        #[arg(long)]
        k: Option<usize>,
    },

    /// Show a summary of the persisted index.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lexindex=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Ingest { dry_run } => {
            let service = Arc::new(EmbeddingService::from_config(&cfg.embedding)?);
            ingest::run_ingest(&cfg, service, dry_run).await?;
        }
        Commands::Search { query, k } => {
            let service = Arc::new(EmbeddingService::from_config(&cfg.embedding)?);
            search::run_search(&cfg, service, &query, k).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg)?;
        }
    }

    Ok(())
}
