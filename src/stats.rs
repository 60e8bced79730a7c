//! Index statistics and health overview.
//!
//! Summarizes the persisted index from its manifest: entry count, dimension,
//! model, build time, and on-disk artifact sizes. Used by `lexidx stats` to
//! give confidence that an ingestion run produced what was expected.

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::Config;
use crate::index;

pub fn run_stats(config: &Config) -> Result<()> {
    let dir = &config.index.dir;
    let manifest = index::load_manifest(dir)
        .with_context(|| format!("no index at {} (run `lexidx ingest` first)", dir.display()))?;

    let built_at = chrono::DateTime::from_timestamp(manifest.built_at, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| manifest.built_at.to_string());

    println!("lexindex — Index Stats");
    println!("======================");
    println!();
    println!("  Location:    {}", dir.display());
    println!("  Entries:     {}", manifest.count);
    println!("  Dimension:   {}", manifest.dim);
    println!("  Model:       {}", manifest.model);
    println!("  Built at:    {}", built_at);
    println!("  Build id:    {}", manifest.build_id);
    println!();
    println!("  Artifacts:");
    for name in ["vectors.bin", "texts.json", "metadatas.json", "manifest.json"] {
        println!("    {:<16} {}", name, format_bytes(artifact_size(dir, name)));
    }

    Ok(())
}

fn artifact_size(dir: &Path, name: &str) -> u64 {
    std::fs::metadata(dir.join(name)).map(|m| m.len()).unwrap_or(0)
}

fn format_bytes(n: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;
    if n >= MIB {
        format!("{:.1} MiB", n as f64 / MIB as f64)
    } else if n >= KIB {
        format!("{:.1} KiB", n as f64 / KIB as f64)
    } else {
        format!("{} B", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MiB");
    }
}
