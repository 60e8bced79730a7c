//! End-to-end pipeline tests.
//!
//! These drive the library through the full load → chunk → embed → index
//! flow with a deterministic in-process embedding backend, so no model
//! download or network access is needed.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use tempfile::TempDir;

use lexindex::config::{
    ChunkingConfig, Config, CorpusConfig, EmbeddingConfig, IndexConfig, RetrievalConfig,
};
use lexindex::embedding::{BackendLoader, EmbeddingBackend, EmbeddingService};
use lexindex::index::FlatIndex;
use lexindex::ingest::{run_ingest, IngestOutcome};
use lexindex::models::DocMetadata;

const DIMS: usize = 16;

/// Deterministic text → vector mapping; identical inputs embed identically.
fn hash_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; DIMS];
    for (i, b) in text.bytes().enumerate() {
        v[i % DIMS] += b as f32 / 255.0;
    }
    v
}

struct HashBackend;

impl EmbeddingBackend for HashBackend {
    fn dims(&self) -> usize {
        DIMS
    }
    fn embed(&mut self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| hash_vector(t)).collect())
    }
}

struct HashLoader {
    loads: Arc<AtomicUsize>,
}

impl BackendLoader for HashLoader {
    fn model_name(&self) -> &str {
        "hash-test"
    }
    fn load(&self) -> Result<Box<dyn EmbeddingBackend>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(HashBackend))
    }
}

fn test_service() -> (Arc<EmbeddingService>, Arc<AtomicUsize>) {
    let loads = Arc::new(AtomicUsize::new(0));
    let loader = HashLoader {
        loads: loads.clone(),
    };
    (Arc::new(EmbeddingService::new(Box::new(loader))), loads)
}

fn test_config(root: &Path) -> Config {
    Config {
        corpus: CorpusConfig {
            dir: root.join("corpus"),
            include_globs: vec!["**/*.pdf".to_string(), "**/*.txt".to_string()],
        },
        index: IndexConfig {
            dir: root.join("index"),
        },
        chunking: ChunkingConfig {
            max_chars: 300,
            overlap_chars: 60,
        },
        embedding: EmbeddingConfig::default(),
        retrieval: RetrievalConfig { top_k: 5 },
    }
}

fn write_corpus(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    fs::write(
        dir.join("IPC__Section-302__Criminal.txt"),
        "Whoever commits murder shall be punished with imprisonment for life.\n\n\
         The court may also impose a fine in addition to the sentence.\n\n\
         Culpable homicide becomes murder when the act is done with the intention \
         of causing death, or bodily injury sufficient in the ordinary course of \
         nature to cause death.\n\n\
         Exceptions apply where the act falls under grave and sudden provocation.",
    )
    .unwrap();
    fs::write(
        dir.join("CrPC__Section-154__Procedure.txt"),
        "Every information relating to the commission of a cognizable offence \
         shall be reduced to writing by the officer in charge of the police station.\n\n\
         A copy of the information as recorded shall be given forthwith, free of \
         cost, to the informant.\n\n\
         Any person aggrieved by a refusal to record information may send the \
         substance of it to the Superintendent of Police.",
    )
    .unwrap();
}

fn read_texts(index_dir: &Path) -> Vec<String> {
    serde_json::from_slice(&fs::read(index_dir.join("texts.json")).unwrap()).unwrap()
}

fn read_metadatas(index_dir: &Path) -> Vec<DocMetadata> {
    serde_json::from_slice(&fs::read(index_dir.join("metadatas.json")).unwrap()).unwrap()
}

#[tokio::test]
async fn build_produces_aligned_artifacts() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    write_corpus(&config.corpus.dir);
    let (service, loads) = test_service();

    let outcome = run_ingest(&config, service, false).await.unwrap();
    let IngestOutcome::Built {
        documents, chunks, ..
    } = outcome
    else {
        panic!("expected a built index, got {:?}", outcome);
    };
    assert_eq!(documents, 2);
    assert!(chunks > 2, "corpus should split into several chunks");
    assert_eq!(loads.load(Ordering::SeqCst), 1);

    let texts = read_texts(&config.index.dir);
    let metadatas = read_metadatas(&config.index.dir);
    assert_eq!(texts.len(), chunks);
    assert_eq!(metadatas.len(), chunks);

    let index = FlatIndex::load(&config.index.dir).unwrap();
    assert_eq!(index.len(), chunks);
    assert_eq!(index.dim(), DIMS);
}

#[tokio::test]
async fn metadata_propagates_to_every_chunk() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    write_corpus(&config.corpus.dir);
    let (service, _) = test_service();

    run_ingest(&config, service, false).await.unwrap();

    let metadatas = read_metadatas(&config.index.dir);
    for meta in &metadatas {
        match meta.source.as_str() {
            "IPC__Section-302__Criminal.txt" => {
                assert_eq!(meta.law, "IPC");
                assert_eq!(meta.section, "Section 302");
                assert_eq!(meta.category, "Criminal");
            }
            "CrPC__Section-154__Procedure.txt" => {
                assert_eq!(meta.law, "CrPC");
                assert_eq!(meta.section, "Section 154");
                assert_eq!(meta.category, "Procedure");
            }
            other => panic!("unexpected source: {}", other),
        }
    }
    assert!(metadatas
        .iter()
        .any(|m| m.source == "IPC__Section-302__Criminal.txt"));
    assert!(metadatas
        .iter()
        .any(|m| m.source == "CrPC__Section-154__Procedure.txt"));
}

#[tokio::test]
async fn corrupt_file_is_excluded_from_build() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    write_corpus(&config.corpus.dir);
    fs::write(config.corpus.dir.join("broken__X__Y.pdf"), b"not a real pdf").unwrap();
    let (service, _) = test_service();

    let outcome = run_ingest(&config, service, false).await.unwrap();
    let IngestOutcome::Built { documents, .. } = outcome else {
        panic!("expected a built index");
    };
    assert_eq!(documents, 2, "the corrupt file must be skipped");

    let metadatas = read_metadatas(&config.index.dir);
    assert!(metadatas.iter().all(|m| m.source != "broken__X__Y.pdf"));
}

#[tokio::test]
async fn empty_corpus_is_a_successful_noop() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    // Corpus directory does not exist yet: created, then treated as empty.
    let (service, loads) = test_service();

    let outcome = run_ingest(&config, service, false).await.unwrap();
    assert_eq!(outcome, IngestOutcome::Empty);
    assert!(config.corpus.dir.is_dir());
    assert!(!config.index.dir.exists(), "no artifacts may be written");
    assert_eq!(loads.load(Ordering::SeqCst), 0, "model must not be loaded");
}

#[tokio::test]
async fn empty_corpus_preserves_previous_index() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    write_corpus(&config.corpus.dir);
    let (service, _) = test_service();

    run_ingest(&config, service.clone(), false).await.unwrap();
    let before = read_texts(&config.index.dir);

    // Empty the corpus and re-run: the old index must survive.
    for entry in fs::read_dir(&config.corpus.dir).unwrap() {
        fs::remove_file(entry.unwrap().path()).unwrap();
    }
    let outcome = run_ingest(&config, service, false).await.unwrap();
    assert_eq!(outcome, IngestOutcome::Empty);

    let after = read_texts(&config.index.dir);
    assert_eq!(before, after);
    assert!(FlatIndex::load(&config.index.dir).is_ok());
}

#[tokio::test]
async fn reingesting_unchanged_corpus_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    write_corpus(&config.corpus.dir);
    let (service, _) = test_service();

    run_ingest(&config, service.clone(), false).await.unwrap();
    let first_texts = read_texts(&config.index.dir);
    let first_metas = read_metadatas(&config.index.dir);

    run_ingest(&config, service, false).await.unwrap();
    let second_texts = read_texts(&config.index.dir);
    let second_metas = read_metadatas(&config.index.dir);

    assert_eq!(first_texts, second_texts);
    assert_eq!(first_metas, second_metas);
}

#[tokio::test]
async fn search_finds_exact_chunk_with_zero_distance() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    write_corpus(&config.corpus.dir);
    let (service, _) = test_service();

    run_ingest(&config, service.clone(), false).await.unwrap();

    let texts = read_texts(&config.index.dir);
    let needle = texts[0].clone();

    let index = FlatIndex::load(&config.index.dir).unwrap();
    let query_vec = service.embed_query(&needle).unwrap();
    let hits = index.search(&query_vec, 3).unwrap();

    assert!(!hits.is_empty());
    assert_eq!(hits[0].text, needle);
    assert!(hits[0].distance.abs() < 1e-6);
    for pair in hits.windows(2) {
        assert!(pair[0].distance <= pair[1].distance);
    }
}

#[tokio::test]
async fn dry_run_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    write_corpus(&config.corpus.dir);
    let (service, loads) = test_service();

    let outcome = run_ingest(&config, service, true).await.unwrap();
    let IngestOutcome::DryRun { documents, chunks } = outcome else {
        panic!("expected a dry run outcome");
    };
    assert_eq!(documents, 2);
    assert!(chunks > 0);
    assert!(!config.index.dir.exists());
    assert_eq!(loads.load(Ordering::SeqCst), 0);
}
