use serde::{Deserialize, Serialize};

/// Arbitrary key/value fields attached to a document.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A single ranked document returned by a search strategy.
///
/// Every strategy run through the executor (lexical, vector, exact match, ...)
/// produces hits of this shape so their results can be merged by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// External document identifier.
    pub id: String,
    /// Relevance score. Higher is better; scales differ between strategies.
    pub score: f32,
    /// Leading excerpt of the document text.
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl SearchHit {
    pub fn new(id: impl Into<String>, score: f32) -> Self {
        Self {
            id: id.into(),
            score,
            snippet: String::new(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = snippet.into();
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Returns a metadata field as a string, if present.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.metadata.get(name).and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder() {
        let mut metadata = Metadata::new();
        metadata.insert("title".to_string(), json!("Camera manual"));

        let hit = SearchHit::new("doc-1", 1.5)
            .with_snippet("camera repair")
            .with_metadata(metadata);

        assert_eq!(hit.id, "doc-1");
        assert_eq!(hit.snippet, "camera repair");
        assert_eq!(hit.field("title"), Some("Camera manual"));
        assert_eq!(hit.field("missing"), None);
    }

    #[test]
    fn test_deserialize_defaults() {
        let hit: SearchHit = serde_json::from_str(r#"{"id": "a", "score": 0.5}"#).unwrap();
        assert!(hit.snippet.is_empty());
        assert!(hit.metadata.is_empty());
    }
}
