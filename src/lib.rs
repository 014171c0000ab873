//! # Braid
//!
//! Hybrid retrieval orchestration for Rust.
//!
//! ## Features
//!
//! - BM25 ranking over a prebuilt lexical index
//! - Concurrent execution of independent search strategies under time budgets
//! - Race-with-fallback between two redundant strategies
//! - Cache namespaces that change whenever the index or configuration does

// Core modules
mod data;
mod error;
pub mod executor;
pub mod lexical;
pub mod namespace;

// Re-exports for the public API
pub use data::{Metadata, SearchHit};
pub use error::{BraidError, Result};
pub use executor::config::ExecutorConfig;
pub use executor::task::{SearchBatchResult, SearchTask};
pub use executor::{Predicate, SearchExecutor};
pub use lexical::bm25::{Bm25Config, Bm25Engine};
pub use lexical::index::{IndexStats, LexicalIndex};
pub use namespace::NamespaceGenerator;
pub use namespace::config::{ConfigSource, EnvSource, RetrievalSettings};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
