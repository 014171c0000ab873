//! Cache namespaces for retrieval responses.
//!
//! A namespace is a short string derived from everything a cached response
//! depends on:
//!
//! ```text
//! <backend>|<index signature>|<config hash>[|<mode>]
//! ```
//!
//! Callers prefix cache keys with it, so any change to the index file, the
//! configuration or an auxiliary resource moves lookups to a fresh namespace
//! and stale entries are never served. Namespaces are recomputed per request
//! and never persisted.

pub mod config;
pub mod signature;

use std::collections::BTreeMap;
use std::path::Path;

use self::config::{ConfigSource, EnvSource, RetrievalSettings};
use self::signature::{file_signature, resource_signature};

/// Index signature used when the index file does not exist.
pub const NO_INDEX: &str = "noindex";
/// Contribution of an optional resource that is switched off or unset.
pub const OFF: &str = "off";
/// Contribution of a resource that is enabled but has no configured location.
pub const NOT_SPECIFIED: &str = "notspecified";

/// Computes cache namespaces from a live configuration source.
pub struct NamespaceGenerator {
    source: Box<dyn ConfigSource>,
}

impl std::fmt::Debug for NamespaceGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespaceGenerator").finish_non_exhaustive()
    }
}

impl NamespaceGenerator {
    pub fn new(source: impl ConfigSource + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }

    /// A generator reading the process environment on every call.
    pub fn from_env() -> Self {
        Self::new(EnvSource)
    }

    /// Current settings as seen by the generator.
    pub fn settings(&self) -> RetrievalSettings {
        RetrievalSettings::from_source(self.source.as_ref())
    }

    /// Namespace for the current filesystem and configuration state.
    ///
    /// Reads file metadata and configuration but changes nothing; identical
    /// state always yields the same string.
    pub fn compute(&self, mode: Option<&str>) -> String {
        compute_namespace(&self.settings(), mode)
    }
}

/// Namespace for `settings`, optionally qualified by a request mode.
///
/// `|` and `%` inside a segment are percent-encoded, so distinct inputs never
/// collapse into the same string.
pub fn compute_namespace(settings: &RetrievalSettings, mode: Option<&str>) -> String {
    let mut namespace = format!(
        "{}|{}|{}",
        escape_segment(&settings.backend),
        escape_segment(&index_signature(&settings.index_path)),
        config_hash(settings)
    );
    if let Some(mode) = mode.map(str::trim).filter(|mode| !mode.is_empty()) {
        namespace.push('|');
        namespace.push_str(&escape_segment(mode));
    }
    namespace
}

fn escape_segment(segment: &str) -> String {
    segment.replace('%', "%25").replace('|', "%7C")
}

pub fn index_signature(path: &Path) -> String {
    file_signature(path).unwrap_or_else(|| NO_INDEX.to_string())
}

/// 8 hex digit digest of the normalized configuration.
///
/// Entries are sorted by key before hashing, so the digest does not depend on
/// the order in which a source enumerates its values.
pub fn config_hash(settings: &RetrievalSettings) -> String {
    let entries = config_entries(settings);
    let joined = entries
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(";");
    format!("{:08x}", crc32fast::hash(joined.as_bytes()))
}

fn config_entries(settings: &RetrievalSettings) -> BTreeMap<&'static str, String> {
    let keyword_file = match &settings.keyword_file {
        Some(path) => resource_signature(path),
        None => OFF.to_string(),
    };
    let exact_match_resource = match (settings.exact_match, &settings.exact_match_db) {
        (false, _) => OFF.to_string(),
        (true, Some(path)) => resource_signature(path),
        (true, None) => NOT_SPECIFIED.to_string(),
    };
    let fts_source = match &settings.fts_source {
        Some(path) => resource_signature(path),
        None => NOT_SPECIFIED.to_string(),
    };

    let entries = [
        ("backend", settings.backend.clone()),
        ("display_limit", settings.display_limit.to_string()),
        ("exact_match", settings.exact_match.to_string()),
        ("exact_match_resource", exact_match_resource),
        ("fts_source", fts_source),
        ("index_path", settings.index_path.to_string_lossy().into_owned()),
        ("keyword_file", keyword_file),
        ("parallel_search", settings.parallel_search.to_string()),
        ("snippet_chars", settings.snippet_chars.to_string()),
        ("top_k", settings.top_k.to_string()),
    ];
    entries
        .into_iter()
        .map(|(key, value)| (key, value.trim().to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;

    #[test]
    fn test_layout_without_mode() {
        let settings = RetrievalSettings {
            index_path: PathBuf::from("/nonexistent/braid/index.json"),
            ..RetrievalSettings::default()
        };
        let namespace = compute_namespace(&settings, None);
        let parts: Vec<&str> = namespace.split('|').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "bm25");
        assert_eq!(parts[1], NO_INDEX);
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_mode_suffix() {
        let settings = RetrievalSettings::default();
        let plain = compute_namespace(&settings, None);

        assert_eq!(compute_namespace(&settings, Some("fast")), format!("{plain}|fast"));
        assert_eq!(compute_namespace(&settings, Some("  ")), plain);
    }

    #[test]
    fn test_mode_separator_is_escaped() {
        let settings = RetrievalSettings::default();
        let plain = compute_namespace(&settings, None);

        let piped = compute_namespace(&settings, Some("a|b"));
        assert_eq!(piped, format!("{plain}|a%7Cb"));
        assert_eq!(piped.split('|').count(), 4);
        assert_ne!(piped, compute_namespace(&settings, Some("a%7Cb")));

        let backend = RetrievalSettings {
            backend: "bm25|x".to_string(),
            ..RetrievalSettings::default()
        };
        assert!(compute_namespace(&backend, None).starts_with("bm25%7Cx|"));
    }

    #[test]
    fn test_config_hash_sensitive_to_each_scalar() {
        let base = RetrievalSettings::default();
        let variants = [
            RetrievalSettings { top_k: 11, ..base.clone() },
            RetrievalSettings { display_limit: 6, ..base.clone() },
            RetrievalSettings { snippet_chars: 100, ..base.clone() },
            RetrievalSettings { parallel_search: false, ..base.clone() },
            RetrievalSettings { exact_match: true, ..base.clone() },
            RetrievalSettings { backend: "faiss".to_string(), ..base.clone() },
            RetrievalSettings { index_path: PathBuf::from("other.json"), ..base.clone() },
            RetrievalSettings {
                keyword_file: Some(PathBuf::from("/nonexistent/kw.txt")),
                ..base.clone()
            },
            RetrievalSettings {
                fts_source: Some(PathBuf::from("/nonexistent/fts.db")),
                ..base.clone()
            },
        ];

        let base_hash = config_hash(&base);
        for variant in &variants {
            assert_ne!(config_hash(variant), base_hash, "{variant:?}");
        }
    }

    #[test]
    fn test_unset_resources_use_sentinels() {
        let entries = config_entries(&RetrievalSettings::default());
        assert_eq!(entries["keyword_file"], OFF);
        assert_eq!(entries["exact_match_resource"], OFF);
        assert_eq!(entries["fts_source"], NOT_SPECIFIED);

        let enabled = RetrievalSettings {
            exact_match: true,
            ..RetrievalSettings::default()
        };
        assert_eq!(config_entries(&enabled)["exact_match_resource"], NOT_SPECIFIED);
    }

    #[test]
    fn test_generator_reads_source() {
        let mut source = HashMap::new();
        source.insert("BRAID_BACKEND".to_string(), "Hybrid".to_string());
        let generator = NamespaceGenerator::new(source);

        assert!(generator.compute(None).starts_with("hybrid|"));
        assert_eq!(generator.settings().backend, "hybrid");
    }
}
