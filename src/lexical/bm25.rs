//! BM25 Okapi scoring engine.
//!
//! For each query term `t` and document `d`:
//!
//! ```text
//! score += idf(t) * (f(t,d) * (k1 + 1)) / (f(t,d) + k1 * (1 - b + b * |d| / avgdl))
//! idf(t) = ln(1 + (N - df(t) + 0.5) / (df(t) + 0.5))
//! ```
//!
//! `idf` falls back to a constant `1.0` when the index has no document
//! frequencies. Results are ordered by descending score with ties broken by
//! ascending document position.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::data::SearchHit;
use crate::error::Result;
use crate::executor::task::SearchTask;
use crate::lexical::index::LexicalIndex;
use crate::lexical::tokenizer::tokenize;

/// Term frequency saturation.
pub const BM25_K1: f32 = 1.6;
/// Document length normalization.
pub const BM25_B: f32 = 0.75;

pub const DEFAULT_TOP_K: usize = 10;
pub const DEFAULT_SNIPPET_CHARS: usize = 5000;

/// Per-engine search options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Config {
    /// Maximum number of hits returned when the caller gives no limit.
    pub top_k: usize,
    /// Length of the leading excerpt attached to each hit, in characters.
    pub snippet_chars: usize,
}

impl Default for Bm25Config {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            snippet_chars: DEFAULT_SNIPPET_CHARS,
        }
    }
}

/// Ranks documents of a [`LexicalIndex`] against free-text queries.
#[derive(Debug, Clone)]
pub struct Bm25Engine {
    index: Arc<LexicalIndex>,
    config: Bm25Config,
}

impl Bm25Engine {
    pub fn new(index: LexicalIndex) -> Self {
        Self::with_config(index, Bm25Config::default())
    }

    pub fn with_config(index: LexicalIndex, config: Bm25Config) -> Self {
        Self {
            index: Arc::new(index),
            config,
        }
    }

    /// Load the index at `path` and build an engine over it.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(LexicalIndex::load(path)?))
    }

    pub fn index(&self) -> &LexicalIndex {
        &self.index
    }

    pub fn config(&self) -> &Bm25Config {
        &self.config
    }

    /// Search with the engine's configuration, optionally overriding `top_k`.
    pub fn search(&self, query: &str, top_k: Option<usize>) -> Vec<SearchHit> {
        let config = Bm25Config {
            top_k: top_k.unwrap_or(self.config.top_k),
            ..self.config
        };
        self.search_with(query, &config)
    }

    pub fn search_with(&self, query: &str, config: &Bm25Config) -> Vec<SearchHit> {
        let mut ranked = self.rank(query);
        ranked.truncate(config.top_k);
        ranked
            .into_iter()
            .map(|(doc, score)| self.hit(doc, score, config.snippet_chars))
            .collect()
    }

    /// Score every document and return `(position, score)` pairs with a
    /// positive score, best first.
    pub fn rank(&self, query: &str) -> Vec<(usize, f32)> {
        let terms = tokenize(query);
        if terms.is_empty() || self.index.is_empty() {
            return Vec::new();
        }

        let idfs: Vec<f32> = terms.iter().map(|term| self.idf(term)).collect();
        let mut ranked: Vec<(usize, f32)> = (0..self.index.len())
            .filter_map(|doc| {
                let score: f32 = terms
                    .iter()
                    .zip(&idfs)
                    .map(|(term, &idf)| self.term_score(doc, term, idf))
                    .sum();
                (score > 0.0).then_some((doc, score))
            })
            .collect();

        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
    }

    /// BM25 score of a single document for `query`.
    pub fn score(&self, query: &str, doc: usize) -> f32 {
        if doc >= self.index.len() {
            return 0.0;
        }
        tokenize(query)
            .iter()
            .map(|term| self.term_score(doc, term, self.idf(term)))
            .sum()
    }

    fn idf(&self, term: &str) -> f32 {
        match self.index.doc_freq(term) {
            Some(df) => {
                let n = self.index.len() as f32;
                let df = df as f32;
                (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
            }
            None => 1.0,
        }
    }

    fn term_score(&self, doc: usize, term: &str, idf: f32) -> f32 {
        let tf = self.index.term_freq(doc, term) as f32;
        if tf == 0.0 {
            return 0.0;
        }
        let dl = self.index.doc_len(doc) as f32;
        let norm = 1.0 - BM25_B + BM25_B * dl / self.index.avg_doc_len();
        idf * (tf * (BM25_K1 + 1.0)) / (tf + BM25_K1 * norm)
    }

    fn hit(&self, doc: usize, score: f32, snippet_chars: usize) -> SearchHit {
        let text = self.index.document(doc).unwrap_or_default();
        let snippet = match text.char_indices().nth(snippet_chars) {
            Some((end, _)) => &text[..end],
            None => text,
        };
        let hit = SearchHit::new(self.index.external_id(doc), score).with_snippet(snippet);
        match self.index.metadata(doc) {
            Some(metadata) => hit.with_metadata(metadata.clone()),
            None => hit,
        }
    }

    /// Wrap a query against this engine as an executor task.
    ///
    /// The task checks its cancellation token before scoring, so a task that
    /// is still queued when its batch times out does no work.
    pub fn into_task(
        self: Arc<Self>,
        name: impl Into<String>,
        query: impl Into<String>,
        top_k: Option<usize>,
    ) -> SearchTask {
        let query = query.into();
        SearchTask::new(name, move |cancel| {
            if cancel.is_cancelled() {
                anyhow::bail!("cancelled before scoring");
            }
            Ok(self.search(&query, top_k))
        })
    }
}
