//! Local fastembed backend.
//!
//! Models are downloaded from Hugging Face on first load and cached; after
//! that, embedding runs entirely offline with the bundled ONNX runtime.

use anyhow::{anyhow, bail, Result};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use super::{BackendLoader, EmbeddingBackend};
use crate::config::EmbeddingConfig;

pub struct LocalLoader {
    model_name: String,
    dims: usize,
    batch_size: usize,
}

impl LocalLoader {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        // Reject unknown model names at construction, not at first embed.
        to_fastembed_model(&config.model)?;
        let dims = config.dims.unwrap_or_else(|| default_dims(&config.model));
        Ok(Self {
            model_name: config.model.clone(),
            dims,
            batch_size: config.batch_size,
        })
    }
}

impl BackendLoader for LocalLoader {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn load(&self) -> Result<Box<dyn EmbeddingBackend>> {
        let model = to_fastembed_model(&self.model_name)?;
        let inner =
            TextEmbedding::try_new(InitOptions::new(model).with_show_download_progress(false))
                .map_err(|e| anyhow!("Failed to initialize local embedding model: {}", e))?;
        Ok(Box::new(LocalBackend {
            inner,
            dims: self.dims,
            batch_size: self.batch_size,
        }))
    }
}

struct LocalBackend {
    inner: TextEmbedding,
    dims: usize,
    batch_size: usize,
}

impl EmbeddingBackend for LocalBackend {
    fn dims(&self) -> usize {
        self.dims
    }

    fn embed(&mut self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        self.inner
            .embed(texts, Some(self.batch_size))
            .map_err(|e| anyhow!("Local embedding failed: {}", e))
    }
}

fn default_dims(name: &str) -> usize {
    match name {
        "all-minilm-l6-v2" => 384,
        "bge-small-en-v1.5" => 384,
        "bge-base-en-v1.5" => 768,
        "bge-large-en-v1.5" => 1024,
        "nomic-embed-text-v1" | "nomic-embed-text-v1.5" => 768,
        "multilingual-e5-small" => 384,
        "multilingual-e5-base" => 768,
        "multilingual-e5-large" => 1024,
        _ => 384,
    }
}

fn to_fastembed_model(name: &str) -> Result<EmbeddingModel> {
    match name {
        "all-minilm-l6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
        "bge-large-en-v1.5" => Ok(EmbeddingModel::BGELargeENV15),
        "nomic-embed-text-v1" => Ok(EmbeddingModel::NomicEmbedTextV1),
        "nomic-embed-text-v1.5" => Ok(EmbeddingModel::NomicEmbedTextV15),
        "multilingual-e5-small" => Ok(EmbeddingModel::MultilingualE5Small),
        "multilingual-e5-base" => Ok(EmbeddingModel::MultilingualE5Base),
        "multilingual-e5-large" => Ok(EmbeddingModel::MultilingualE5Large),
        other => bail!(
            "Unknown local embedding model: '{}'. Supported models: \
             all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5, bge-large-en-v1.5, \
             nomic-embed-text-v1, nomic-embed-text-v1.5, \
             multilingual-e5-small, multilingual-e5-base, multilingual-e5-large",
            other
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_models_resolve_dims() {
        assert_eq!(default_dims("all-minilm-l6-v2"), 384);
        assert_eq!(default_dims("bge-large-en-v1.5"), 1024);
    }

    #[test]
    fn unknown_model_rejected_at_construction() {
        let config = EmbeddingConfig {
            model: "not-a-model".to_string(),
            ..EmbeddingConfig::default()
        };
        assert!(LocalLoader::new(&config).is_err());
    }

    #[test]
    fn explicit_dims_override_defaults() {
        let config = EmbeddingConfig {
            dims: Some(512),
            ..EmbeddingConfig::default()
        };
        let loader = LocalLoader::new(&config).unwrap();
        assert_eq!(loader.dims, 512);
    }
}
