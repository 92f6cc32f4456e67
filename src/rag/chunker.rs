//! Splits document text into overlapping chunks for embedding.

use sha2::{Digest, Sha256};

use crate::core::config::RagSettings;

#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
    /// Maximum chunks produced per document
    pub max_chunks: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self::from(&RagSettings::default())
    }
}

impl From<&RagSettings> for ChunkerConfig {
    fn from(settings: &RagSettings) -> Self {
        Self {
            chunk_size: settings.chunk_size,
            chunk_overlap: settings.chunk_overlap,
            max_chunks: settings.max_chunks_per_document,
        }
    }
}

/// A text chunk with its position in the source document.
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    pub text: String,
    /// Character offset in the source text
    pub start_offset: usize,
    /// Chunk index within the document
    pub chunk_index: usize,
}

#[derive(Debug, Clone, Default)]
pub struct TextChunker {
    config: ChunkerConfig,
}

impl TextChunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    /// Split text into overlapping chunks, preferring to end a chunk on a
    /// sentence boundary. The next chunk starts `chunk_overlap` characters
    /// before the actual cut, so no text falls between chunks.
    /// Whitespace-only chunks are dropped.
    pub fn split(&self, text: &str) -> Vec<TextChunk> {
        let chunk_size = self.config.chunk_size.max(1);
        let overlap = self.config.chunk_overlap;
        let max_chunks = self.config.max_chunks;

        let mut chunks = Vec::new();
        let chars: Vec<char> = text.chars().collect();
        let total_chars = chars.len();

        if total_chars == 0 {
            return chunks;
        }

        let mut start = 0;

        while start < total_chars && chunks.len() < max_chunks {
            let end = (start + chunk_size).min(total_chars);
            let window = &chars[start..end];

            let cut = if end < total_chars {
                sentence_cut(window)
            } else {
                window.len()
            };
            let chunk_text: String = window[..cut].iter().collect();

            let trimmed = chunk_text.trim();
            if !trimmed.is_empty() {
                chunks.push(TextChunk {
                    text: trimmed.to_string(),
                    start_offset: start,
                    chunk_index: chunks.len(),
                });
            }

            let cut_end = start + cut;
            if cut_end >= total_chars {
                break;
            }
            start = cut_end.saturating_sub(overlap).max(start + 1);
        }

        chunks
    }
}

/// Stable chunk identifier: hex SHA-256 of `url#index`.
pub fn chunk_id(url: &str, chunk_index: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hasher.update(b"#");
    hasher.update(chunk_index.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Length in chars of `window` up to the last sentence ending found in its
/// final 20%, or the whole window when there is none.
fn sentence_cut(window: &[char]) -> usize {
    const ENDINGS: [char; 3] = ['.', '!', '?'];

    let search_start = (window.len() * 80) / 100;
    (search_start..window.len().saturating_sub(1))
        .rev()
        .find(|&i| ENDINGS.contains(&window[i]) && matches!(window[i + 1], ' ' | '\n'))
        .map(|i| i + 2)
        .unwrap_or(window.len())
}
