mod cli;
mod output;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use braid::{Bm25Engine, ExecutorConfig, LexicalIndex, NamespaceGenerator, SearchExecutor};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, SearchCommand};
use crate::output::OutputFormat;

/// How long shutdown waits for a search body abandoned at the deadline.
const SHUTDOWN_GRACE_MS: u64 = 100;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = cli.format;

    match cli.command {
        Command::Search(cmd) => search(cmd, format),
        Command::Stats(cmd) => {
            let index = LexicalIndex::load(&cmd.index)
                .with_context(|| format!("Failed to load index {}", cmd.index.display()))?;
            output::print_stats(&index.stats(), format)
        }
        Command::Namespace(cmd) => {
            let namespace = NamespaceGenerator::from_env().compute(cmd.mode.as_deref());
            output::print_namespace(&namespace, format)
        }
    }
}

/// Run the query through the executor so the timeout applies.
fn search(cmd: SearchCommand, format: OutputFormat) -> Result<()> {
    let engine = Bm25Engine::open(&cmd.index)
        .with_context(|| format!("Failed to load index {}", cmd.index.display()))?;
    let engine = Arc::new(engine);

    let executor = cli_executor()?;
    let task = engine.into_task("bm25", cmd.query, Some(cmd.top_k));
    let batch = executor.execute_searches(
        vec![task],
        None,
        Some(Duration::from_millis(cmd.timeout_ms)),
    )?;
    executor.shutdown();

    if let Some(error) = batch.error("bm25") {
        anyhow::bail!("Search failed: {error}");
    }
    output::print_hits(batch.hits("bm25").unwrap_or_default(), format)
}

/// An executor whose shutdown never outlives `--timeout-ms` by more than the
/// grace period.
fn cli_executor() -> Result<SearchExecutor> {
    let config = ExecutorConfig::new().shutdown_timeout_ms(SHUTDOWN_GRACE_MS);
    Ok(SearchExecutor::with_config(config)?)
}
