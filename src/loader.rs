//! Corpus loading, text normalization, and filename metadata extraction.
//!
//! Scans the corpus directory for recognized files (sorted by relative path
//! for determinism), extracts and normalizes each file's text, and derives
//! provenance metadata from the filename convention
//! `<Law>__<Section>__<Category>.<ext>`.
//!
//! Failure containment: a file that cannot be parsed, or that yields no text
//! after normalization, is logged and skipped — one bad input never aborts
//! the batch. A missing corpus directory is created and treated as an empty
//! corpus.

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use walkdir::WalkDir;

use crate::config::CorpusConfig;
use crate::extract;
use crate::models::{DocMetadata, SourceDocument};

/// `Page N` / `Page N of M` on a line of its own.
static PAGE_FOOTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^[ \t]*page[ \t]+\d+([ \t]+of[ \t]+\d+)?[ \t]*$").expect("valid regex")
});

/// `- N -` page markers on a line of their own.
static DASHED_PAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*-[ \t]*\d+[ \t]*-[ \t]*$").expect("valid regex"));

static BLANK_RUNS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

static HSPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").expect("valid regex"));

/// Load every recognized file under the corpus directory, in filename order.
pub fn load_corpus(config: &CorpusConfig) -> Result<Vec<SourceDocument>> {
    let root = &config.dir;
    if !root.exists() {
        tracing::warn!(dir = %root.display(), "corpus directory does not exist; creating it");
        std::fs::create_dir_all(root)?;
        return Ok(Vec::new());
    }

    let include_set = build_globset(&config.include_globs)?;

    let mut paths: Vec<(String, PathBuf)> = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();
        if !include_set.is_match(&rel_str) {
            continue;
        }
        paths.push((rel_str, path.to_path_buf()));
    }

    // Sort for deterministic ordering
    paths.sort_by(|a, b| a.0.cmp(&b.0));

    if paths.is_empty() {
        tracing::warn!(dir = %root.display(), "no recognized files in corpus directory");
        return Ok(Vec::new());
    }

    let mut documents = Vec::new();
    for (rel, path) in paths {
        match load_document(&path) {
            Ok(Some(doc)) => {
                tracing::info!(file = %rel, chars = doc.text.len(), "loaded document");
                documents.push(doc);
            }
            Ok(None) => {
                tracing::warn!(file = %rel, "document yielded no text; skipping");
            }
            Err(e) => {
                tracing::error!(file = %rel, error = %e, "failed to load document; skipping");
            }
        }
    }

    Ok(documents)
}

fn load_document(path: &Path) -> Result<Option<SourceDocument>> {
    let bytes = std::fs::read(path)?;
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();

    let raw = extract::extract_text(&bytes, &extension)?;
    let text = normalize_text(&raw);
    if text.is_empty() {
        return Ok(None);
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let metadata = parse_filename_metadata(&file_name);

    Ok(Some(SourceDocument {
        path: path.to_path_buf(),
        text,
        metadata,
    }))
}

/// Clean extracted text: normalize line endings, strip page-number and
/// footer lines, collapse blank-line runs to one blank line, and collapse
/// horizontal whitespace runs to a single space (newlines preserved).
pub fn normalize_text(text: &str) -> String {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = PAGE_FOOTER_RE.replace_all(&text, "");
    let text = DASHED_PAGE_RE.replace_all(&text, "");
    let text = BLANK_RUNS_RE.replace_all(&text, "\n\n");
    let text = HSPACE_RE.replace_all(&text, " ");
    text.trim().to_string()
}

/// Derive metadata from a filename using the `<Law>__<Section>__<Category>`
/// convention. Total over any filename string: missing or empty fields fall
/// back to defaults, and hyphens/underscores within a field become spaces.
pub fn parse_filename_metadata(file_name: &str) -> DocMetadata {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut parts = stem.splitn(3, "__");
    let law = parts
        .next()
        .map(despace)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Unknown".to_string());
    let section = parts.next().map(despace).unwrap_or_default();
    let category = parts
        .next()
        .map(despace)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "General".to_string());

    DocMetadata {
        law,
        section,
        category,
        source: file_name.to_string(),
    }
}

fn despace(field: &str) -> String {
    field.replace(['-', '_'], " ")
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
