use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

/// Braid - hybrid retrieval orchestration CLI
#[derive(Parser)]
#[command(name = "braid", version, about)]
pub struct Cli {
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Rank documents of a lexical index against a query.
    Search(SearchCommand),
    /// Show lexical index statistics.
    Stats(StatsCommand),
    /// Print the cache namespace for the current environment.
    Namespace(NamespaceCommand),
}

#[derive(Parser)]
pub struct SearchCommand {
    /// Query text.
    pub query: String,

    /// Path to the serialized lexical index.
    #[arg(long, env = "BRAID_INDEX_PATH", default_value = "index/bm25_index.json")]
    pub index: PathBuf,

    /// Maximum number of hits.
    #[arg(long, env = "BRAID_TOP_K", default_value_t = 10)]
    pub top_k: usize,

    /// Give up after this many milliseconds.
    #[arg(long, default_value_t = 5000)]
    pub timeout_ms: u64,
}

#[derive(Parser)]
pub struct StatsCommand {
    /// Path to the serialized lexical index.
    #[arg(long, env = "BRAID_INDEX_PATH", default_value = "index/bm25_index.json")]
    pub index: PathBuf,
}

#[derive(Parser)]
pub struct NamespaceCommand {
    /// Optional request mode tag appended to the namespace.
    #[arg(long)]
    pub mode: Option<String>,
}
