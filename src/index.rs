//! Exact nearest-neighbor vector index with positional side stores.
//!
//! The index is a flat matrix of embedding vectors searched by squared
//! Euclidean distance — exact, unpruned, unquantized. Correctness and
//! simplicity over asymptotic query speed; appropriate while the corpus
//! stays below roughly 100k vectors.
//!
//! # Artifacts
//!
//! A build persists four files into the destination directory:
//!
//! | File | Contents |
//! |------|----------|
//! | `vectors.bin` | magic + version + dim + count header, little-endian f32 rows |
//! | `texts.json` | chunk texts, one per row |
//! | `metadatas.json` | chunk metadata records, one per row |
//! | `manifest.json` | model, dim, count, build id, per-artifact SHA-256 |
//!
//! The ordinal position is the join key: row `i` of every artifact refers to
//! the same chunk. [`FlatIndex::load`] verifies checksums and equal lengths,
//! so a torn or hand-edited artifact set is rejected rather than silently
//! misjoined.
//!
//! # Publication
//!
//! A build is atomic-by-replacement: artifacts are written into a staging
//! directory next to the destination, then swapped in with `fs::rename`.
//! A reader opening the destination sees either the previous complete set or
//! the new complete set, never a mix. Rebuilds replace the index wholesale;
//! there is no incremental append.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::{Chunk, DocMetadata, SearchHit};

const VECTORS_FILE: &str = "vectors.bin";
const TEXTS_FILE: &str = "texts.json";
const METADATAS_FILE: &str = "metadatas.json";
const MANIFEST_FILE: &str = "manifest.json";

const VECTORS_MAGIC: [u8; 4] = *b"LXVI";
const FORMAT_VERSION: u32 = 1;

/// Build provenance and integrity record, persisted as `manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexManifest {
    pub format_version: u32,
    pub model: String,
    pub dim: usize,
    pub count: usize,
    /// Unix timestamp of the build.
    pub built_at: i64,
    pub build_id: String,
    pub checksums: ArtifactChecksums,
}

/// SHA-256 hex digests of the three positional artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactChecksums {
    pub vectors: String,
    pub texts: String,
    pub metadatas: String,
}

/// In-memory exact-search index over aligned (vector, text, metadata) rows.
#[derive(Debug)]
pub struct FlatIndex {
    dim: usize,
    /// Row-major, `count × dim`.
    vectors: Vec<f32>,
    texts: Vec<String>,
    metadatas: Vec<DocMetadata>,
}

impl FlatIndex {
    /// Assemble an index from chunks and their embeddings, aligned by ordinal.
    pub fn build(chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<Self> {
        if chunks.len() != embeddings.len() {
            bail!(
                "misaligned build input: {} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            );
        }
        if embeddings.is_empty() {
            bail!("cannot build an index from zero entries");
        }

        let dim = embeddings[0].len();
        if dim == 0 {
            bail!("embeddings have zero dimension");
        }

        let mut vectors = Vec::with_capacity(embeddings.len() * dim);
        for (i, vector) in embeddings.iter().enumerate() {
            if vector.len() != dim {
                bail!(
                    "embedding {} has dimension {} (expected {})",
                    i,
                    vector.len(),
                    dim
                );
            }
            vectors.extend_from_slice(vector);
        }

        Ok(Self {
            dim,
            vectors,
            texts: chunks.iter().map(|c| c.text.clone()).collect(),
            metadatas: chunks.iter().map(|c| c.metadata.clone()).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Return up to `k` entries nearest to `query`, ascending by squared
    /// Euclidean distance. Ties break on ordinal for determinism.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dim {
            bail!(
                "query has dimension {} but the index was built with {}",
                query.len(),
                self.dim
            );
        }

        let mut scored: Vec<(f32, usize)> = (0..self.len())
            .map(|i| {
                let row = &self.vectors[i * self.dim..(i + 1) * self.dim];
                (squared_l2(query, row), i)
            })
            .collect();

        scored.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(distance, i)| SearchHit {
                distance,
                text: self.texts[i].clone(),
                metadata: self.metadatas[i].clone(),
            })
            .collect())
    }

    /// Persist all artifacts to `dest`, atomically by replacement.
    ///
    /// Artifacts are written into a staging directory, then swapped into
    /// place with renames; on any write failure the staging directory is
    /// discarded and the previous index (if any) is left untouched.
    pub fn persist(&self, dest: &Path, model: &str) -> Result<IndexManifest> {
        let build_id = uuid::Uuid::new_v4().to_string();
        let staging = sibling_path(dest, "staging", &build_id);

        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::create_dir_all(&staging)?;

        let manifest = match self.write_artifacts(&staging, model, &build_id) {
            Ok(manifest) => manifest,
            Err(e) => {
                let _ = fs::remove_dir_all(&staging);
                return Err(e).context("failed to write index artifacts");
            }
        };

        // Swap: retire the old directory, move the staging set into place,
        // then drop the retired set.
        if dest.exists() {
            let retired = sibling_path(dest, "old", &build_id);
            fs::rename(dest, &retired)?;
            if let Err(e) = fs::rename(&staging, dest) {
                // Roll the old index back so a reader still finds a complete set.
                let _ = fs::rename(&retired, dest);
                let _ = fs::remove_dir_all(&staging);
                return Err(e).context("failed to publish index");
            }
            if let Err(e) = fs::remove_dir_all(&retired) {
                tracing::warn!(dir = %retired.display(), error = %e, "could not remove retired index");
            }
        } else {
            fs::rename(&staging, dest).context("failed to publish index")?;
        }

        tracing::info!(
            dest = %dest.display(),
            count = manifest.count,
            dim = manifest.dim,
            "index published"
        );
        Ok(manifest)
    }

    fn write_artifacts(&self, staging: &Path, model: &str, build_id: &str) -> Result<IndexManifest> {
        let vectors_bytes = self.encode_vectors();
        let texts_bytes = serde_json::to_vec_pretty(&self.texts)?;
        let metadatas_bytes = serde_json::to_vec_pretty(&self.metadatas)?;

        fs::write(staging.join(VECTORS_FILE), &vectors_bytes)?;
        fs::write(staging.join(TEXTS_FILE), &texts_bytes)?;
        fs::write(staging.join(METADATAS_FILE), &metadatas_bytes)?;

        let manifest = IndexManifest {
            format_version: FORMAT_VERSION,
            model: model.to_string(),
            dim: self.dim,
            count: self.len(),
            built_at: chrono::Utc::now().timestamp(),
            build_id: build_id.to_string(),
            checksums: ArtifactChecksums {
                vectors: hex_digest(&vectors_bytes),
                texts: hex_digest(&texts_bytes),
                metadatas: hex_digest(&metadatas_bytes),
            },
        };
        fs::write(
            staging.join(MANIFEST_FILE),
            serde_json::to_vec_pretty(&manifest)?,
        )?;

        Ok(manifest)
    }

    /// Read a persisted index, verifying checksums and the ordinal invariant.
    pub fn load(dir: &Path) -> Result<Self> {
        let manifest = load_manifest(dir)?;

        let vectors_bytes = fs::read(dir.join(VECTORS_FILE))?;
        let texts_bytes = fs::read(dir.join(TEXTS_FILE))?;
        let metadatas_bytes = fs::read(dir.join(METADATAS_FILE))?;

        verify_checksum(VECTORS_FILE, &vectors_bytes, &manifest.checksums.vectors)?;
        verify_checksum(TEXTS_FILE, &texts_bytes, &manifest.checksums.texts)?;
        verify_checksum(METADATAS_FILE, &metadatas_bytes, &manifest.checksums.metadatas)?;

        let (dim, count, vectors) = decode_vectors(&vectors_bytes)?;
        let texts: Vec<String> = serde_json::from_slice(&texts_bytes)?;
        let metadatas: Vec<DocMetadata> = serde_json::from_slice(&metadatas_bytes)?;

        if dim != manifest.dim || count != manifest.count {
            bail!("vectors artifact disagrees with the manifest");
        }
        if texts.len() != count || metadatas.len() != count {
            bail!(
                "index artifacts are misaligned: {} vectors, {} texts, {} metadata records",
                count,
                texts.len(),
                metadatas.len()
            );
        }

        Ok(Self {
            dim,
            vectors,
            texts,
            metadatas,
        })
    }

    /// Little-endian f32 rows behind a fixed header.
    fn encode_vectors(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(20 + self.vectors.len() * 4);
        bytes.extend_from_slice(&VECTORS_MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&(self.dim as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.len() as u64).to_le_bytes());
        for value in &self.vectors {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes
    }
}

/// Read just the manifest of a persisted index.
pub fn load_manifest(dir: &Path) -> Result<IndexManifest> {
    let bytes = fs::read(dir.join(MANIFEST_FILE))
        .with_context(|| format!("failed to read index manifest in {}", dir.display()))?;
    let manifest: IndexManifest = serde_json::from_slice(&bytes)?;
    if manifest.format_version != FORMAT_VERSION {
        bail!(
            "unsupported index format version {} (expected {})",
            manifest.format_version,
            FORMAT_VERSION
        );
    }
    Ok(manifest)
}

fn decode_vectors(bytes: &[u8]) -> Result<(usize, usize, Vec<f32>)> {
    if bytes.len() < 20 {
        bail!("vectors artifact truncated");
    }
    if bytes[0..4] != VECTORS_MAGIC {
        bail!("vectors artifact has wrong magic bytes");
    }
    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version != FORMAT_VERSION {
        bail!("unsupported vectors format version {}", version);
    }
    let dim = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
    let count = u64::from_le_bytes([
        bytes[12], bytes[13], bytes[14], bytes[15], bytes[16], bytes[17], bytes[18], bytes[19],
    ]) as usize;

    let expected = count
        .checked_mul(dim)
        .and_then(|n| n.checked_mul(4))
        .and_then(|n| n.checked_add(20))
        .ok_or_else(|| anyhow::anyhow!("vectors artifact header overflows"))?;
    if bytes.len() != expected {
        bail!(
            "vectors artifact length mismatch: {} bytes for {} × {} vectors",
            bytes.len(),
            count,
            dim
        );
    }

    let vectors = bytes[20..]
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    Ok((dim, count, vectors))
}

fn verify_checksum(name: &str, bytes: &[u8], expected: &str) -> Result<()> {
    let actual = hex_digest(bytes);
    if actual != expected {
        bail!("checksum mismatch for {}: index artifacts are inconsistent", name);
    }
    Ok(())
}

fn hex_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn sibling_path(dest: &Path, label: &str, build_id: &str) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "index".to_string());
    dest.with_file_name(format!(".{}.{}-{}", name, label, build_id))
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
