use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::Config;
use crate::embedding::EmbeddingService;
use crate::index::FlatIndex;
use crate::models::SearchHit;

/// Run the search command: embed the query, scan the index, print results.
pub async fn run_search(
    config: &Config,
    service: Arc<EmbeddingService>,
    query: &str,
    k: Option<usize>,
) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let k = k.unwrap_or(config.retrieval.top_k);

    let index = FlatIndex::load(&config.index.dir).with_context(|| {
        format!(
            "no readable index at {} (run `lexidx ingest` first)",
            config.index.dir.display()
        )
    })?;

    let owned = query.to_string();
    let svc = service.clone();
    let query_vec = tokio::task::spawn_blocking(move || svc.embed_query(&owned))
        .await
        .context("embedding task panicked")??;

    let hits = index.search(&query_vec, k)?;
    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (rank, hit) in hits.iter().enumerate() {
        print_hit(rank + 1, hit);
    }

    Ok(())
}

fn print_hit(rank: usize, hit: &SearchHit) {
    let heading = if hit.metadata.section.is_empty() {
        format!("{} [{}]", hit.metadata.law, hit.metadata.category)
    } else {
        format!(
            "{} — {} [{}]",
            hit.metadata.law, hit.metadata.section, hit.metadata.category
        )
    };
    println!("{}. {}  (distance {:.4})", rank, heading, hit.distance);
    println!("   source: {}", hit.metadata.source);
    println!("   {}", snippet(&hit.text, 200));
}

/// Single-line excerpt, truncated on a char boundary.
fn snippet(text: &str, max_chars: usize) -> String {
    let flat = text.replace('\n', " ");
    let mut out: String = flat.chars().take(max_chars).collect();
    if flat.chars().count() > max_chars {
        out.push('…');
    }
    out
}
