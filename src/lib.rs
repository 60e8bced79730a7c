//! # lexindex
//!
//! A local-first ingestion and vector-index pipeline for legal document
//! retrieval.
//!
//! lexindex ingests a directory of legal documents (PDF, DOCX, plain text),
//! splits them into overlapping passages with provenance metadata derived
//! from filenames, embeds each passage, and publishes an exact-search vector
//! index that a downstream question-answering service queries.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────┐   ┌───────────┐   ┌───────────┐
//! │  Loader   │──▶│ Chunker │──▶│ Embedding │──▶│ FlatIndex │
//! │ PDF/DOCX │   │ overlap │   │  service  │   │ 4 files   │
//! └──────────┘   └─────────┘   └───────────┘   └─────┬─────┘
//!                                                    │
//!                                    ┌───────────────┤
//!                                    ▼               ▼
//!                               ┌─────────┐    ┌──────────┐
//!                               │   CLI   │    │ QA layer │
//!                               │ (lexidx)│    │ (search) │
//!                               └─────────┘    └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! lexidx ingest                       # load, chunk, embed, build the index
//! lexidx search "punishment for murder"
//! lexidx stats                        # summarize the persisted index
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`models`] | Core data types |
//! | [`extract`] | Per-format text extraction |
//! | [`loader`] | Corpus scan, normalization, filename metadata |
//! | [`chunk`] | Separator-priority chunking with overlap |
//! | [`embedding`] | Lazily-initialized embedding service and backends |
//! | [`index`] | Exact nearest-neighbor index and persistence |
//! | [`ingest`] | Pipeline orchestration |
//! | [`search`] | Query command |
//! | [`stats`] | Index summary |

pub mod chunk;
pub mod config;
pub mod embedding;
pub mod extract;
pub mod index;
pub mod ingest;
pub mod loader;
pub mod models;
pub mod search;
pub mod stats;
