//! Query and document tokenizer.
//!
//! The scorer only produces meaningful results when queries are tokenized the
//! same way the index builder tokenized documents. Serialized indexes may carry
//! a `tokenizer` tag; the loader rejects indexes whose tag differs from
//! [`TOKENIZER_ID`].

/// Identifier of the tokenizer implemented here.
pub const TOKENIZER_ID: &str = "whitespace-lowercase-v1";

/// Lowercase `text` and split it on whitespace, dropping empty tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}
