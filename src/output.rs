use anyhow::Result;
use braid::{IndexStats, SearchHit};
use clap::ValueEnum;
use serde_json::json;

/// Output format for CLI results.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text.
    Table,
    /// JSON output.
    Json,
}

const PREVIEW_CHARS: usize = 80;

/// Print search hits.
pub fn print_hits(hits: &[SearchHit], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(hits)?);
        }
        OutputFormat::Table => {
            if hits.is_empty() {
                println!("No results found.");
                return Ok(());
            }
            for (rank, hit) in hits.iter().enumerate() {
                let preview: String = hit
                    .snippet
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ")
                    .chars()
                    .take(PREVIEW_CHARS)
                    .collect();
                println!("{:>3}. {:<24} {:>8.4}  {}", rank + 1, hit.id, hit.score, preview);
            }
        }
    }
    Ok(())
}

/// Print index statistics.
pub fn print_stats(stats: &IndexStats, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(stats)?);
        }
        OutputFormat::Table => {
            println!("documents:       {}", stats.documents);
            println!("vocabulary:      {}", stats.vocabulary);
            println!("avg doc length:  {:.2}", stats.avg_doc_len);
            println!("doc freqs:       {}", stats.has_doc_freqs);
            println!("term freqs:      {}", stats.has_term_freqs);
        }
    }
    Ok(())
}

/// Print a cache namespace.
pub fn print_namespace(namespace: &str, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", json!({ "namespace": namespace })),
        OutputFormat::Table => println!("{namespace}"),
    }
    Ok(())
}
