//! Lexical search over a prebuilt inverted index using BM25 scoring.
//!
//! # Module Structure
//!
//! - `tokenizer`: The whitespace/lowercase tokenizer shared with the index builder
//! - `index`: Loading and normalizing the serialized lexical index
//! - `bm25`: The Okapi BM25 scoring engine

pub mod bm25;
pub mod index;
pub mod tokenizer;

// Re-exports
pub use bm25::{BM25_B, BM25_K1, Bm25Config, Bm25Engine};
pub use index::{IndexStats, LexicalIndex};
pub use tokenizer::{TOKENIZER_ID, tokenize};
