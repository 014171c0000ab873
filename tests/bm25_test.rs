use std::io::Write;

use serde_json::json;
use tempfile::NamedTempFile;

use braid::lexical::tokenize;
use braid::{Bm25Engine, BraidError, LexicalIndex};

fn build_engine(docs: &[&str]) -> Bm25Engine {
    let docs = docs.iter().map(|d| d.to_string()).collect();
    Bm25Engine::new(LexicalIndex::from_documents(docs, None).unwrap())
}

/// Serialize `value` the way an external index builder would.
fn index_file(value: serde_json::Value) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&serde_json::to_vec(&value).unwrap()).unwrap();
    file
}

#[test]
fn test_camera_repair_scenario() {
    let engine = build_engine(&[
        "camera repair 2020",
        "camera purchase 2021",
        "monitor repair 2019",
    ]);
    let hits = engine.search("camera repair", None);

    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].id, "0");
    assert!(hits[0].score > hits[1].score);
    assert!(hits[0].score > hits[2].score);

    // Documents 1 and 2 each match one term with the same df and length.
    let diff = (hits[1].score - hits[2].score).abs();
    assert!(diff < 1e-5, "scores should be comparable, diff = {diff}");
    assert_eq!(hits[1].id, "1");
    assert_eq!(hits[2].id, "2");
}

#[test]
fn test_monotonic_in_term_frequency() {
    // Same length for every document, increasing frequency of "rust".
    let engine = build_engine(&[
        "rust a b c",
        "rust rust b c",
        "rust rust rust c",
        "rust rust rust rust",
        "z y x w",
    ]);
    let scores: Vec<f32> = (0..4).map(|doc| engine.score("rust", doc)).collect();
    for pair in scores.windows(2) {
        assert!(pair[1] >= pair[0], "scores not monotonic: {scores:?}");
    }
}

#[test]
fn test_results_ordered_and_positive() {
    let engine = build_engine(&[
        "alpha beta gamma",
        "beta beta delta",
        "gamma alpha",
        "epsilon",
        "alpha alpha alpha beta",
        "beta gamma",
    ]);
    for query in ["alpha", "beta gamma", "alpha beta gamma delta", "epsilon alpha"] {
        let ranked = engine.rank(query);
        for pair in ranked.windows(2) {
            assert!(pair[0].1 >= pair[1].1, "{query}: not descending");
            if pair[0].1 == pair[1].1 {
                assert!(pair[0].0 < pair[1].0, "{query}: tie not broken by position");
            }
        }
        assert!(ranked.iter().all(|&(_, score)| score > 0.0));
    }
}

#[test]
fn test_query_is_tokenized_like_documents() {
    let engine = build_engine(&["Camera Repair"]);
    assert_eq!(tokenize("  CAMERA\trepair "), vec!["camera", "repair"]);
    assert_eq!(engine.search("  CAMERA\trepair ", None).len(), 1);
}

#[test]
fn test_open_new_layout_with_metadata() {
    let file = index_file(json!({
        "documents": ["camera repair 2020", "camera purchase 2021", "monitor repair 2019"],
        "metadata": [
            {"doc_id": "manual-1", "year": 2020},
            {"doc_id": "invoice-7", "year": 2021},
            {"doc_id": "manual-2", "year": 2019}
        ],
        "doc_freqs": {
            "camera": 2, "repair": 2, "2020": 1, "purchase": 1,
            "2021": 1, "monitor": 1, "2019": 1
        },
        "term_freqs": [
            {"camera": 1, "repair": 1, "2020": 1},
            {"camera": 1, "purchase": 1, "2021": 1},
            {"monitor": 1, "repair": 1, "2019": 1}
        ],
        "doc_lens": [3, 3, 3],
        "avg_doc_len": 3.0
    }));

    let engine = Bm25Engine::open(file.path()).unwrap();
    let hits = engine.search("camera repair", Some(1));

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "manual-1");
    assert_eq!(hits[0].snippet, "camera repair 2020");
    assert_eq!(hits[0].metadata["year"], json!(2020));
}

#[test]
fn test_open_legacy_layout() {
    let file = index_file(json!({
        "doc_ids": ["a", "b"],
        "texts": ["the camera", "the monitor"],
        "avgdl": 2.0
    }));

    let engine = Bm25Engine::open(file.path()).unwrap();
    let hits = engine.search("monitor", None);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "b");
}

#[test]
fn test_substring_fallback_over_counts() {
    // Without term_freqs, "cat" is counted inside "concatenate".
    let file = index_file(json!({"documents": ["concatenate", "dog"]}));
    let engine = Bm25Engine::open(file.path()).unwrap();
    let hits = engine.search("cat", None);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "0");

    // With precomputed counts the same query matches nothing.
    let exact = build_engine(&["concatenate", "dog"]);
    assert!(exact.search("cat", None).is_empty());
}

#[test]
fn test_open_invalid_index_is_fatal() {
    let file = index_file(json!({"doc_ids": ["a"]}));
    let err = Bm25Engine::open(file.path()).unwrap_err();
    assert!(matches!(err, BraidError::InvalidIndex(_)));

    let err = Bm25Engine::open("/nonexistent/braid/index.json").unwrap_err();
    assert!(matches!(err, BraidError::InvalidIndex(_)));
}
