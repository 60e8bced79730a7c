//! Separator-priority text chunker.
//!
//! Splits normalized document text into passages bounded by a configured
//! character count, with a configured overlap between adjacent passages from
//! the same document. Splitting recursively tries separators in priority
//! order — paragraph break, line break, sentence-ending space, plain space —
//! and falls back to a raw character cut only when no separator keeps a
//! segment under the limit.
//!
//! Separators stay attached to the preceding segment, so concatenating the
//! split segments reconstructs the input exactly; nothing is lost at a chunk
//! boundary.

use std::collections::VecDeque;

use crate::config::ChunkingConfig;
use crate::models::{Chunk, SourceDocument};

/// Split priorities, highest first. The empty-string fallback of the classic
/// recursive splitter is realized as [`hard_cut`].
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// Chunk every document, cloning the document's metadata onto each chunk.
///
/// Chunk order follows document order; chunks from different documents are
/// never merged or overlapped. A document with empty text yields no chunks.
pub fn chunk_documents(documents: &[SourceDocument], config: &ChunkingConfig) -> Vec<Chunk> {
    let mut chunks = Vec::new();

    for doc in documents {
        let texts = split_text(&doc.text, config.max_chars, config.overlap_chars);
        tracing::debug!(
            source = %doc.metadata.source,
            count = texts.len(),
            "chunked document"
        );
        for text in texts {
            chunks.push(Chunk {
                text,
                metadata: doc.metadata.clone(),
            });
        }
    }

    tracing::info!(total = chunks.len(), "chunking complete");
    chunks
}

/// Split `text` into passages of at most `max_chars` characters, adjacent
/// passages overlapping by roughly `overlap_chars` (overlap is granular to
/// the split segments, so the exact shared length varies).
pub fn split_text(text: &str, max_chars: usize, overlap_chars: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let pieces = split_recursive(text, &SEPARATORS, max_chars);
    merge_pieces(pieces, max_chars, overlap_chars)
}

/// Recursively split until every piece fits in `max_chars` characters.
fn split_recursive(text: &str, separators: &[&str], max_chars: usize) -> Vec<String> {
    if char_len(text) <= max_chars {
        return vec![text.to_string()];
    }

    let Some((&sep, rest)) = separators.split_first() else {
        return hard_cut(text, max_chars);
    };

    if !text.contains(sep) {
        return split_recursive(text, rest, max_chars);
    }

    let mut pieces = Vec::new();
    for part in text.split_inclusive(sep) {
        if char_len(part) <= max_chars {
            pieces.push(part.to_string());
        } else {
            pieces.extend(split_recursive(part, rest, max_chars));
        }
    }
    pieces
}

/// Last-resort split at character boundaries, every `max_chars` characters.
fn hard_cut(text: &str, max_chars: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut count = 0;
    for ch in text.chars() {
        current.push(ch);
        count += 1;
        if count == max_chars {
            out.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Greedily accumulate pieces into chunks up to `max_chars`, carrying a tail
/// of roughly `overlap_chars` characters into the next chunk.
fn merge_pieces(pieces: Vec<String>, max_chars: usize, overlap_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut window: VecDeque<String> = VecDeque::new();
    let mut window_len = 0usize;

    for piece in pieces {
        let piece_len = char_len(&piece);

        if window_len > 0 && window_len + piece_len > max_chars {
            chunks.push(window.iter().map(String::as_str).collect());

            // Drop from the front until only the overlap tail remains and the
            // incoming piece fits.
            while window_len > overlap_chars
                || (window_len > 0 && window_len + piece_len > max_chars)
            {
                match window.pop_front() {
                    Some(front) => window_len -= char_len(&front),
                    None => break,
                }
            }
        }

        window_len += piece_len;
        window.push_back(piece);
    }

    if window_len > 0 {
        chunks.push(window.iter().map(String::as_str).collect());
    }

    chunks
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
