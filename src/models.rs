//! Core data models used throughout the ingestion pipeline.
//!
//! These types represent the documents, chunks, and search hits that flow
//! from the corpus loader to the persisted index.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Provenance metadata derived from a source filename.
///
/// Filenames follow the convention `<Law>__<Section>__<Category>.<ext>`;
/// fields missing from a non-conforming name fall back to defaults (see
/// [`crate::loader::parse_filename_metadata`]). Every chunk carries an
/// independent clone of its document's metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocMetadata {
    pub law: String,
    pub section: String,
    pub category: String,
    /// Original filename, for tracing a retrieved chunk back to its document.
    pub source: String,
}

/// A loaded, normalized source document. Ephemeral: discarded once chunked.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub text: String,
    pub metadata: DocMetadata,
}

/// A bounded-length passage of a document's text, the unit of retrieval.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub text: String,
    pub metadata: DocMetadata,
}

/// A ranked result returned from the vector index.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// Squared Euclidean distance to the query vector (lower is closer).
    pub distance: f32,
    pub text: String,
    pub metadata: DocMetadata,
}
