use std::sync::Arc;

use super::chunker::{chunk_id, ChunkerConfig, TextChunker};
use super::document::{Document, DocumentMatch, StoredDocument};
use super::store::{ChunkSearchResult, StoredChunk, VectorStore};
use crate::core::config::RagSettings;
use crate::core::errors::ApiError;
use crate::llm::LlmService;

/// Document cache backed by a [`VectorStore`], embedding text through the
/// configured LLM provider.
#[derive(Clone)]
pub struct VectorDatabase {
    store: Arc<dyn VectorStore>,
    llm: LlmService,
    chunker: Arc<TextChunker>,
    cache_threshold: f32,
}

impl VectorDatabase {
    pub fn new(store: Arc<dyn VectorStore>, llm: LlmService, settings: &RagSettings) -> Self {
        Self {
            store,
            llm,
            chunker: Arc::new(TextChunker::new(ChunkerConfig::from(settings))),
            cache_threshold: settings.cache_similarity_threshold,
        }
    }

    /// Distinct stored documents with at least one chunk at or above the
    /// cache threshold, best first, at most `limit`.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<DocumentMatch>, ApiError> {
        if self.store.count().await? == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.llm.embed_query(query).await?;
        // Several chunks can belong to one document, so over-fetch before collapsing.
        let candidates = self
            .store
            .search(&query_embedding, limit.max(1) * 4)
            .await?;

        let mut matches: Vec<DocumentMatch> = Vec::new();
        for result in candidates {
            if result.score < self.cache_threshold {
                break;
            }
            if matches.iter().any(|m| m.url == result.chunk.document_url) {
                continue;
            }
            matches.push(DocumentMatch {
                url: result.chunk.document_url,
                title: result.chunk.title,
                score: result.score,
            });
            if matches.len() >= limit {
                break;
            }
        }

        Ok(matches)
    }

    /// Top-k chunks for the query regardless of threshold.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<ChunkSearchResult>, ApiError> {
        if self.store.count().await? == 0 {
            return Ok(Vec::new());
        }
        let query_embedding = self.llm.embed_query(query).await?;
        self.store.search(&query_embedding, top_k).await
    }

    /// Chunk, embed and persist documents. Documents with blank content or a
    /// URL that is already stored are skipped. Returns how many were stored.
    pub async fn add_documents(&self, documents: &[Document]) -> Result<usize, ApiError> {
        let mut stored = 0;

        for document in documents {
            if document.content.trim().is_empty() {
                tracing::debug!(url = %document.url, "Skipping document without content");
                continue;
            }
            if self.store.contains_document(&document.url).await? {
                tracing::debug!(url = %document.url, "Document already stored");
                continue;
            }

            let text_chunks = self.chunker.split(&document.content);
            if text_chunks.is_empty() {
                continue;
            }

            let inputs: Vec<String> = text_chunks.iter().map(|c| c.text.clone()).collect();
            let embeddings = self.llm.embed(&inputs).await?;

            let chunks: Vec<(StoredChunk, Vec<f32>)> = text_chunks
                .into_iter()
                .zip(embeddings)
                .map(|(chunk, embedding)| {
                    (
                        StoredChunk {
                            chunk_id: chunk_id(&document.url, chunk.chunk_index),
                            document_url: document.url.clone(),
                            title: document.title.clone(),
                            content: chunk.text,
                            chunk_index: chunk.chunk_index,
                        },
                        embedding,
                    )
                })
                .collect();

            let chunk_count = chunks.len();
            if self.store.insert_document(document, chunks).await? {
                stored += 1;
                tracing::debug!(url = %document.url, chunk_count, "Stored document");
            }
        }

        Ok(stored)
    }

    pub async fn get_all_documents(&self, limit: usize) -> Result<Vec<StoredDocument>, ApiError> {
        self.store.list_documents(limit).await
    }

    pub async fn clear_documents(&self) -> Result<usize, ApiError> {
        self.store.clear().await
    }

    pub async fn check_connection(&self) -> bool {
        match self.store.ping().await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, "Vector store ping failed");
                false
            }
        }
    }

    /// Resets the store when its vectors came from a different embedding
    /// model. Returns whether a reset happened.
    pub async fn sync_embedding_model(&self) -> Result<bool, ApiError> {
        let configured = self.llm.embedding_model();
        let recorded = self.store.embedding_model().await?;

        if recorded.as_deref() == Some(configured) {
            return Ok(false);
        }

        let had_documents = self.store.count().await? > 0;
        self.store.reindex_with_model(configured).await?;
        if had_documents {
            tracing::warn!(
                previous = recorded.as_deref().unwrap_or("unknown"),
                current = configured,
                "Embedding model changed; cleared stored documents"
            );
        }
        Ok(recorded.is_some() || had_documents)
    }
}
