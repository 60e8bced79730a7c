//! Embedding service and backend implementations.
//!
//! The [`EmbeddingService`] is the one concurrency-sensitive component of the
//! pipeline: a process-wide, lazily-initialized wrapper around an embedding
//! model, shared between the ingestion run and any query-serving threads in
//! the hosting process.
//!
//! Backends implement [`EmbeddingBackend`] and are constructed through a
//! [`BackendLoader`]:
//! - **local** — runs models via fastembed; no network calls after the model
//!   download (feature `local-embeddings`, on by default).
//! - **openai** — calls an OpenAI-compatible `/v1/embeddings` endpoint with
//!   batching, retry, and backoff.
//!
//! # Initialization
//!
//! The model is NOT loaded when the service is constructed; the first
//! `embed_*` call loads it exactly once, even when several threads race to
//! first use. The discipline is double-checked: a shared read-lock check, an
//! exclusive lock, a re-check under the exclusive lock, then the load.
//! Steady-state calls only take the shared read lock plus the per-model call
//! lock. A failed load leaves the slot empty — the error surfaces to that
//! caller and the next call attempts a fresh load.

#[cfg(feature = "local-embeddings")]
mod local;
mod openai;

use anyhow::{bail, Result};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

use crate::config::EmbeddingConfig;

/// A loaded embedding model.
///
/// Calls take `&mut self` because inference sessions are not shareable; the
/// service serializes calls through a lock around the loaded backend.
pub trait EmbeddingBackend: Send {
    /// Vector dimensionality, constant for the backend's lifetime.
    fn dims(&self) -> usize;
    /// Embed a batch, returning one vector per input in input order.
    fn embed(&mut self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;
}

/// Constructs a backend on first use.
///
/// Loading may download model weights or read credentials, so it is deferred
/// until an embed call actually needs the model.
pub trait BackendLoader: Send + Sync {
    /// Model identifier, for diagnostics.
    fn model_name(&self) -> &str;
    fn load(&self) -> Result<Box<dyn EmbeddingBackend>>;
}

type SharedBackend = Arc<Mutex<Box<dyn EmbeddingBackend>>>;

/// Process-wide embedding service with lazy, thread-safe initialization.
///
/// Constructed once (see `main`) and shared via `Arc`; safe for unbounded
/// concurrent callers.
pub struct EmbeddingService {
    loader: Box<dyn BackendLoader>,
    slot: RwLock<Option<SharedBackend>>,
}

impl EmbeddingService {
    pub fn new(loader: Box<dyn BackendLoader>) -> Self {
        Self {
            loader,
            slot: RwLock::new(None),
        }
    }

    /// Service for the provider named in the configuration.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        Ok(Self::new(create_loader(config)?))
    }

    /// Model identifier of the configured backend.
    pub fn model_name(&self) -> &str {
        self.loader.model_name()
    }

    /// Whether the backend has been loaded yet.
    pub fn is_loaded(&self) -> bool {
        self.slot.read().is_some()
    }

    /// Vector dimensionality, once the backend is loaded.
    pub fn dims(&self) -> Option<usize> {
        self.slot.read().as_ref().map(|b| b.lock().dims())
    }

    /// Embed a batch of texts, one vector per input, in input order.
    ///
    /// An empty batch returns an empty vector without touching the model.
    pub fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let backend = self.backend()?;
        let mut model = backend.lock();
        let vectors = model.embed(texts.to_vec())?;

        if vectors.len() != texts.len() {
            bail!(
                "embedding backend returned {} vectors for {} inputs",
                vectors.len(),
                texts.len()
            );
        }

        Ok(vectors)
    }

    /// Embed a single query string; identical to a one-element batch.
    pub fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let batch = [text.to_string()];
        let vectors = self.embed_texts(&batch)?;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("empty embedding response"))
    }

    /// Return the loaded backend, loading it on first use.
    fn backend(&self) -> Result<SharedBackend> {
        // Fast path: shared lock only.
        if let Some(backend) = self.slot.read().as_ref() {
            return Ok(backend.clone());
        }

        let mut slot = self.slot.write();
        // Another thread may have loaded while we waited for the write lock.
        if let Some(backend) = slot.as_ref() {
            return Ok(backend.clone());
        }

        tracing::info!(model = %self.loader.model_name(), "loading embedding model");
        let backend = Arc::new(Mutex::new(self.loader.load()?));
        tracing::info!(model = %self.loader.model_name(), "embedding model loaded");
        *slot = Some(backend.clone());
        Ok(backend)
    }
}

/// Create the loader for the provider named in the configuration.
pub fn create_loader(config: &EmbeddingConfig) -> Result<Box<dyn BackendLoader>> {
    match config.provider.as_str() {
        #[cfg(feature = "local-embeddings")]
        "local" => Ok(Box::new(local::LocalLoader::new(config)?)),
        #[cfg(not(feature = "local-embeddings"))]
        "local" => bail!("Local embedding provider requires --features local-embeddings"),
        "openai" => Ok(Box::new(openai::OpenAiLoader::new(config)?)),
        other => bail!("Unknown embedding provider: {}", other),
    }
}
