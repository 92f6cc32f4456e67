//! RAG Context Builder.
//!
//! Turns retrieved chunks into a prompt context where every distinct
//! document gets a citation number, and returns the matching source list.

use super::document::Source;
use super::store::ChunkSearchResult;

/// Configuration for context building.
#[derive(Debug, Clone)]
pub struct ContextBuilderConfig {
    /// Maximum total context length in characters
    pub max_context_length: usize,
}

impl Default for ContextBuilderConfig {
    fn default() -> Self {
        Self {
            max_context_length: 6000,
        }
    }
}

/// Context text plus the sources it cites, in citation order.
#[derive(Debug, Clone, Default)]
pub struct BuiltContext {
    pub context: String,
    pub sources: Vec<Source>,
}

impl BuiltContext {
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

pub struct RAGContextBuilder {
    config: ContextBuilderConfig,
}

impl RAGContextBuilder {
    pub fn new(config: ContextBuilderConfig) -> Self {
        Self { config }
    }

    /// Build context from chunks that are already sorted best first.
    ///
    /// Chunks from the same document share one citation number. A chunk that
    /// would push the context past the length budget is skipped, and a
    /// document whose chunks were all skipped is not cited. The best chunk is
    /// truncated to the budget rather than skipped, so a non-empty result
    /// always yields some context.
    pub fn build(&self, results: &[ChunkSearchResult]) -> BuiltContext {
        let max_length = self.config.max_context_length;
        let mut sources: Vec<Source> = Vec::new();
        let mut sections: Vec<(usize, &str)> = Vec::new();
        let mut current_length = 0;

        for result in results {
            let mut text = result.chunk.content.trim();
            if text.is_empty() {
                continue;
            }

            let existing = sources
                .iter()
                .position(|source| source.url == result.chunk.document_url);
            let header_length = match existing {
                Some(_) => 0,
                None => result.chunk.title.len() + result.chunk.document_url.len() + 16,
            };
            if current_length + text.len() + header_length + 2 > max_length {
                if !sections.is_empty() {
                    continue;
                }
                let room = max_length.saturating_sub(header_length + 2);
                text = floor_char_boundary(text, room).trim_end();
                if text.is_empty() {
                    continue;
                }
            }
            let addition_length = text.len() + header_length + 2;

            let index = match existing {
                Some(index) => index,
                None => {
                    sources.push(Source {
                        title: display_title(&result.chunk.title, &result.chunk.document_url),
                        url: result.chunk.document_url.clone(),
                        relevance: result.score,
                    });
                    sources.len() - 1
                }
            };

            sections.push((index, text));
            current_length += addition_length;
        }

        BuiltContext {
            context: format_context(&sources, &sections),
            sources,
        }
    }
}

/// Groups sections under their numbered source header.
fn format_context(sources: &[Source], sections: &[(usize, &str)]) -> String {
    let mut context = String::new();

    for (index, source) in sources.iter().enumerate() {
        context.push_str(&format!("[{}] {} ({})\n", index + 1, source.title, source.url));
        for (_, text) in sections.iter().filter(|(owner, _)| *owner == index) {
            context.push_str(text);
            context.push_str("\n\n");
        }
    }

    context.trim().to_string()
}

fn floor_char_boundary(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn display_title(title: &str, url: &str) -> String {
    let title = title.trim();
    if title.is_empty() {
        url.to_string()
    } else {
        title.to_string()
    }
}
