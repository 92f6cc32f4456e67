use serde::{Deserialize, Serialize};

/// A crawled web page. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub url: String,
    pub title: String,
    pub content: String,
}

/// A persisted document as returned by listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    pub url: String,
    pub title: String,
    pub content: String,
    pub chunk_count: usize,
    pub created_at: String,
}

/// A stored document that matched a query above the cache threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMatch {
    pub url: String,
    pub title: String,
    /// Best chunk similarity for this document.
    pub score: f32,
}

/// A cited source in an answer. Numbered by position: the first source is `[1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub url: String,
    pub relevance: f32,
}
