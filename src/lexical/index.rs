//! The immutable lexical index consumed by the BM25 engine.
//!
//! Indexes are produced by an external builder and serialized as JSON. Two
//! field-naming conventions are in circulation:
//!
//! | field                | current       | legacy                 |
//! |----------------------|---------------|------------------------|
//! | document text        | `documents`   | `doc_texts` / `texts`  |
//! | external ids         | `metadata`    | `doc_ids`              |
//! | average doc length   | `avg_doc_len` | `avgdl`                |
//!
//! `doc_freqs`, `term_freqs` and `doc_lens` share the same name in both.
//! [`LexicalIndex`] normalizes either layout once at load time so the scorer
//! only ever sees one shape.

use std::collections::HashMap;
use std::path::Path;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::data::Metadata;
use crate::error::{BraidError, Result};
use crate::lexical::tokenizer::{TOKENIZER_ID, tokenize};

/// Metadata key holding the external document identifier.
pub const DOC_ID_FIELD: &str = "doc_id";

/// On-disk layout, accepting both naming conventions.
#[derive(Debug, Default, Deserialize)]
struct RawIndex {
    documents: Option<Vec<String>>,
    doc_texts: Option<Vec<String>>,
    texts: Option<Vec<String>>,
    metadata: Option<Vec<Metadata>>,
    doc_ids: Option<Vec<serde_json::Value>>,
    doc_freqs: Option<HashMap<String, u32>>,
    term_freqs: Option<Vec<HashMap<String, u32>>>,
    doc_lens: Option<Vec<u32>>,
    avg_doc_len: Option<f32>,
    avgdl: Option<f32>,
    tokenizer: Option<String>,
}

/// Summary of a loaded index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStats {
    pub documents: usize,
    /// Distinct terms with a known document frequency (0 without `doc_freqs`).
    pub vocabulary: usize,
    pub avg_doc_len: f32,
    pub has_doc_freqs: bool,
    pub has_term_freqs: bool,
}

/// Precomputed corpus statistics for BM25 scoring.
///
/// Position in `documents` is the internal document id. All per-document
/// vectors have the same length; this is checked at construction.
#[derive(Debug, Clone)]
pub struct LexicalIndex {
    documents: Vec<String>,
    metadata: Vec<Metadata>,
    doc_freqs: Option<HashMap<String, u32>>,
    term_freqs: Option<Vec<HashMap<String, u32>>>,
    doc_lens: Vec<u32>,
    avg_doc_len: f32,
    /// Lowercased document text for substring counting when `term_freqs` is absent.
    lowered: Option<Vec<String>>,
}

impl LexicalIndex {
    /// Load a serialized index from `path`.
    ///
    /// A missing file, malformed JSON, or a blob without usable document text
    /// is an error; nothing is silently degraded at this stage.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|err| {
            BraidError::invalid_index(format!("failed to read {}: {err}", path.display()))
        })?;
        let index = Self::from_json_slice(&bytes)?;
        debug!(
            "loaded lexical index from {} ({} documents)",
            path.display(),
            index.len()
        );
        Ok(index)
    }

    /// Parse a serialized index held in memory.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        let raw: RawIndex = serde_json::from_slice(bytes)
            .map_err(|err| BraidError::invalid_index(format!("malformed index blob: {err}")))?;
        Self::normalize(raw)
    }

    /// Build an index in memory from raw document text.
    ///
    /// Term frequencies, document frequencies and lengths are computed with
    /// [`tokenize`], so scoring is exact. An empty corpus is allowed here and
    /// simply never matches.
    pub fn from_documents(documents: Vec<String>, metadata: Option<Vec<Metadata>>) -> Result<Self> {
        let metadata = match metadata {
            Some(metadata) => {
                check_len("metadata", metadata.len(), documents.len())?;
                metadata
            }
            None => vec![Metadata::new(); documents.len()],
        };

        let mut doc_freqs: HashMap<String, u32> = HashMap::new();
        let mut term_freqs = Vec::with_capacity(documents.len());
        let mut doc_lens = Vec::with_capacity(documents.len());

        for text in &documents {
            let tokens = tokenize(text);
            doc_lens.push(tokens.len() as u32);

            let mut counts: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *counts.entry(token).or_insert(0) += 1;
            }
            for term in counts.keys() {
                *doc_freqs.entry(term.clone()).or_insert(0) += 1;
            }
            term_freqs.push(counts);
        }

        let avg_doc_len = mean_len(&doc_lens);
        Ok(Self {
            documents,
            metadata,
            doc_freqs: Some(doc_freqs),
            term_freqs: Some(term_freqs),
            doc_lens,
            avg_doc_len,
            lowered: None,
        })
    }

    fn normalize(raw: RawIndex) -> Result<Self> {
        if let Some(tag) = raw.tokenizer.as_deref() {
            if tag != TOKENIZER_ID {
                return Err(BraidError::invalid_index(format!(
                    "index was built with tokenizer '{tag}', expected '{TOKENIZER_ID}'"
                )));
            }
        }

        let legacy = raw.documents.is_none();
        let documents = raw
            .documents
            .or(raw.doc_texts)
            .or(raw.texts)
            .ok_or_else(|| {
                BraidError::invalid_index(
                    "no document text field (expected `documents`, `doc_texts` or `texts`)",
                )
            })?;
        if documents.is_empty() {
            return Err(BraidError::invalid_index("index contains no documents"));
        }
        if legacy {
            debug!("normalizing legacy index layout");
        }

        let n = documents.len();
        let mut metadata = match raw.metadata {
            Some(metadata) => {
                check_len("metadata", metadata.len(), n)?;
                metadata
            }
            None => vec![Metadata::new(); n],
        };
        if let Some(doc_ids) = raw.doc_ids {
            check_len("doc_ids", doc_ids.len(), n)?;
            for (fields, id) in metadata.iter_mut().zip(doc_ids) {
                fields.entry(DOC_ID_FIELD).or_insert(id);
            }
        }

        if let Some(term_freqs) = &raw.term_freqs {
            check_len("term_freqs", term_freqs.len(), n)?;
        }

        let doc_lens = match raw.doc_lens {
            Some(doc_lens) => {
                check_len("doc_lens", doc_lens.len(), n)?;
                doc_lens
            }
            None => documents
                .iter()
                .map(|text| tokenize(text).len() as u32)
                .collect(),
        };

        let avg_doc_len = match raw.avg_doc_len.or(raw.avgdl) {
            Some(avg) if avg.is_finite() && avg > 0.0 => avg,
            _ => mean_len(&doc_lens),
        };

        if raw.doc_freqs.is_none() {
            warn!("index has no doc_freqs; scoring with constant idf");
        }
        let lowered = if raw.term_freqs.is_none() {
            warn!("index has no term_freqs; counting terms by substring match");
            Some(documents.iter().map(|text| text.to_lowercase()).collect())
        } else {
            None
        };

        Ok(Self {
            documents,
            metadata,
            doc_freqs: raw.doc_freqs,
            term_freqs: raw.term_freqs,
            doc_lens,
            avg_doc_len,
            lowered,
        })
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn document(&self, doc: usize) -> Option<&str> {
        self.documents.get(doc).map(String::as_str)
    }

    pub fn metadata(&self, doc: usize) -> Option<&Metadata> {
        self.metadata.get(doc)
    }

    /// External identifier of a document: metadata `doc_id`, then `id`, then
    /// the position itself.
    pub fn external_id(&self, doc: usize) -> String {
        let fields = self.metadata.get(doc);
        fields
            .and_then(|m| m.get(DOC_ID_FIELD).or_else(|| m.get("id")))
            .map(|value| match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| doc.to_string())
    }

    pub fn doc_len(&self, doc: usize) -> u32 {
        self.doc_lens.get(doc).copied().unwrap_or(0)
    }

    pub fn avg_doc_len(&self) -> f32 {
        self.avg_doc_len
    }

    /// Number of documents containing `term`, or `None` if the index carries
    /// no document frequencies at all.
    pub fn doc_freq(&self, term: &str) -> Option<u32> {
        self.doc_freqs
            .as_ref()
            .map(|freqs| freqs.get(term).copied().unwrap_or(0))
    }

    pub fn has_doc_freqs(&self) -> bool {
        self.doc_freqs.is_some()
    }

    /// Occurrences of `term` in document `doc`.
    ///
    /// Uses precomputed counts when available. Otherwise counts non-overlapping
    /// substring matches in the lowercased text, which over-counts when the
    /// term appears inside longer words.
    pub fn term_freq(&self, doc: usize, term: &str) -> u32 {
        if let Some(term_freqs) = &self.term_freqs {
            return term_freqs
                .get(doc)
                .and_then(|counts| counts.get(term))
                .copied()
                .unwrap_or(0);
        }
        let text = match &self.lowered {
            Some(lowered) => lowered.get(doc).map(String::as_str),
            None => self.document(doc),
        };
        match text {
            Some(text) if !term.is_empty() => text.matches(term).count() as u32,
            _ => 0,
        }
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            documents: self.len(),
            vocabulary: self.doc_freqs.as_ref().map_or(0, HashMap::len),
            avg_doc_len: self.avg_doc_len,
            has_doc_freqs: self.doc_freqs.is_some(),
            has_term_freqs: self.term_freqs.is_some(),
        }
    }
}

fn check_len(field: &str, actual: usize, expected: usize) -> Result<()> {
    if actual != expected {
        return Err(BraidError::invalid_index(format!(
            "`{field}` has {actual} entries but there are {expected} documents"
        )));
    }
    Ok(())
}

/// Mean document length, never zero so it can divide.
fn mean_len(doc_lens: &[u32]) -> f32 {
    if doc_lens.is_empty() {
        return 1.0;
    }
    let total: u64 = doc_lens.iter().map(|&len| u64::from(len)).sum();
    let mean = total as f32 / doc_lens.len() as f32;
    if mean > 0.0 { mean } else { 1.0 }
}
