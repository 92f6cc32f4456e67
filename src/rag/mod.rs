//! Document storage and retrieval-augmented answering.
//!
//! - `VectorDatabase`: chunk, embed and persist crawled documents; cache lookup
//! - `RagSystem`: build a cited context from stored chunks and query the LLM

mod chunker;
mod context_builder;
mod database;
mod document;
mod sqlite;
mod store;
mod system;

pub use chunker::{chunk_id, ChunkerConfig, TextChunk, TextChunker};
pub use context_builder::{BuiltContext, ContextBuilderConfig, RAGContextBuilder};
pub use database::VectorDatabase;
pub use document::{Document, DocumentMatch, Source, StoredDocument};
pub use sqlite::SqliteVectorStore;
pub use store::{ChunkSearchResult, StoredChunk, VectorStore};
pub use system::{RagResponse, RagSystem, NO_CONTEXT_ANSWER};
