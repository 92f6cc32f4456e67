//! VectorStore trait: abstract interface for document storage backends.
//!
//! The primary implementation is `SqliteVectorStore` in the `sqlite` module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::document::{Document, StoredDocument};
use crate::core::errors::ApiError;

/// A stored chunk of a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    /// Stable identifier derived from the document URL and chunk index.
    pub chunk_id: String,
    pub document_url: String,
    /// Title of the owning document.
    pub title: String,
    pub content: String,
    pub chunk_index: usize,
}

/// Result of a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSearchResult {
    pub chunk: StoredChunk,
    /// Cosine similarity (higher = better).
    pub score: f32,
}

/// Abstract trait for document storage backends.
///
/// Documents are append-only: inserting a URL that is already stored is a
/// no-op, and the only removal path is [`VectorStore::clear`].
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert a document and its embedded chunks atomically.
    ///
    /// Returns `false` when a document with the same URL already exists.
    async fn insert_document(
        &self,
        document: &Document,
        chunks: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<bool, ApiError>;

    async fn contains_document(&self, url: &str) -> Result<bool, ApiError>;

    /// Search for chunks similar to the query embedding, best first.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, ApiError>;

    /// Newest documents first.
    async fn list_documents(&self, limit: usize) -> Result<Vec<StoredDocument>, ApiError>;

    /// Delete every document and chunk. Returns the number of documents removed.
    async fn clear(&self) -> Result<usize, ApiError>;

    async fn count(&self) -> Result<usize, ApiError>;

    /// Cheap round-trip to the backend.
    async fn ping(&self) -> Result<(), ApiError>;

    /// Embedding model that produced the stored vectors, if recorded.
    async fn embedding_model(&self) -> Result<Option<String>, ApiError>;

    /// Clear all data and record the embedding model for future vectors.
    async fn reindex_with_model(&self, embedding_model: &str) -> Result<(), ApiError>;
}
