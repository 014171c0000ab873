//! Environment-style configuration consumed by the namespace generator.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::lexical::bm25::{DEFAULT_SNIPPET_CHARS, DEFAULT_TOP_K};

pub const BACKEND_KEY: &str = "BRAID_BACKEND";
pub const TOP_K_KEY: &str = "BRAID_TOP_K";
pub const DISPLAY_LIMIT_KEY: &str = "BRAID_DISPLAY_LIMIT";
pub const SNIPPET_CHARS_KEY: &str = "BRAID_SNIPPET_CHARS";
pub const PARALLEL_SEARCH_KEY: &str = "BRAID_PARALLEL_SEARCH";
pub const EXACT_MATCH_KEY: &str = "BRAID_EXACT_MATCH";
pub const INDEX_PATH_KEY: &str = "BRAID_INDEX_PATH";
pub const KEYWORD_FILE_KEY: &str = "BRAID_KEYWORD_FILE";
pub const EXACT_MATCH_DB_KEY: &str = "BRAID_EXACT_MATCH_DB";
pub const FTS_SOURCE_KEY: &str = "BRAID_FTS_SOURCE";

pub const DEFAULT_BACKEND: &str = "bm25";
pub const DEFAULT_DISPLAY_LIMIT: usize = 5;
pub const DEFAULT_INDEX_PATH: &str = "index/bm25_index.json";

/// A key/value configuration lookup.
pub trait ConfigSource: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads configuration from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSource;

impl ConfigSource for EnvSource {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

impl ConfigSource for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        BTreeMap::get(self, key).cloned()
    }
}

/// A typed snapshot of the retrieval configuration.
///
/// A key set to a blank or whitespace-only value reads as unset: it takes the
/// default, and an optional resource path becomes `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalSettings {
    pub backend: String,
    pub top_k: usize,
    pub display_limit: usize,
    pub snippet_chars: usize,
    pub parallel_search: bool,
    pub exact_match: bool,
    pub index_path: PathBuf,
    pub keyword_file: Option<PathBuf>,
    pub exact_match_db: Option<PathBuf>,
    pub fts_source: Option<PathBuf>,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            backend: DEFAULT_BACKEND.to_string(),
            top_k: DEFAULT_TOP_K,
            display_limit: DEFAULT_DISPLAY_LIMIT,
            snippet_chars: DEFAULT_SNIPPET_CHARS,
            parallel_search: true,
            exact_match: false,
            index_path: PathBuf::from(DEFAULT_INDEX_PATH),
            keyword_file: None,
            exact_match_db: None,
            fts_source: None,
        }
    }
}

impl RetrievalSettings {
    /// Read every setting from `source`, falling back to defaults for unset
    /// or unparsable values.
    pub fn from_source(source: &dyn ConfigSource) -> Self {
        let defaults = Self::default();
        Self {
            backend: text(source, BACKEND_KEY)
                .map(|backend| backend.to_lowercase())
                .unwrap_or(defaults.backend),
            top_k: number(source, TOP_K_KEY, defaults.top_k),
            display_limit: number(source, DISPLAY_LIMIT_KEY, defaults.display_limit),
            snippet_chars: number(source, SNIPPET_CHARS_KEY, defaults.snippet_chars),
            parallel_search: flag(source, PARALLEL_SEARCH_KEY, defaults.parallel_search),
            exact_match: flag(source, EXACT_MATCH_KEY, defaults.exact_match),
            index_path: text(source, INDEX_PATH_KEY)
                .map(PathBuf::from)
                .unwrap_or(defaults.index_path),
            keyword_file: text(source, KEYWORD_FILE_KEY).map(PathBuf::from),
            exact_match_db: text(source, EXACT_MATCH_DB_KEY).map(PathBuf::from),
            fts_source: text(source, FTS_SOURCE_KEY).map(PathBuf::from),
        }
    }

    pub fn from_env() -> Self {
        Self::from_source(&EnvSource)
    }
}

/// Trimmed value, with blank treated as unset.
fn text(source: &dyn ConfigSource, key: &str) -> Option<String> {
    source
        .get(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn number(source: &dyn ConfigSource, key: &str, default: usize) -> usize {
    match text(source, key) {
        Some(value) => value.parse().unwrap_or_else(|_| {
            warn!("ignoring {key}={value:?}: not a non-negative integer");
            default
        }),
        None => default,
    }
}

fn flag(source: &dyn ConfigSource, key: &str, default: bool) -> bool {
    let Some(value) = text(source, key) else {
        return default;
    };
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            warn!("ignoring {key}={value:?}: not a boolean");
            default
        }
    }
}
