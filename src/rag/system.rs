//! Answer generation over retrieved chunks.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::context_builder::{ContextBuilderConfig, RAGContextBuilder};
use super::database::VectorDatabase;
use super::document::Source;
use crate::core::config::RagSettings;
use crate::core::errors::ApiError;
use crate::llm::{ChatMessage, LlmService};

pub const NO_CONTEXT_ANSWER: &str =
    "I could not find relevant information to answer this question.";

const SYSTEM_PROMPT: &str = "You are a research assistant. Answer the user's question using only \
the numbered sources provided. Cite every claim with the source number in square brackets, \
for example [1] or [2][3]. If the sources do not contain the answer, say so plainly. \
Do not invent sources or URLs.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagResponse {
    pub answer: String,
    pub sources: Vec<Source>,
}

#[derive(Clone)]
pub struct RagSystem {
    db: VectorDatabase,
    llm: LlmService,
    builder: Arc<RAGContextBuilder>,
    top_k: usize,
}

impl RagSystem {
    pub fn new(db: VectorDatabase, llm: LlmService, settings: &RagSettings) -> Self {
        let builder = RAGContextBuilder::new(ContextBuilderConfig {
            max_context_length: settings.max_context_chars,
        });
        Self {
            db,
            llm,
            builder: Arc::new(builder),
            top_k: settings.top_k.max(1),
        }
    }

    /// Retrieve the best chunks for `query` and ask the chat model for a
    /// cited answer. Sources are returned in citation order.
    pub async fn generate_response_with_sources(&self, query: &str) -> Result<RagResponse, ApiError> {
        let results = self.db.retrieve(query, self.top_k).await?;
        let built = self.builder.build(&results);

        if built.is_empty() {
            tracing::info!("No context retrieved for query");
            return Ok(RagResponse {
                answer: NO_CONTEXT_ANSWER.to_string(),
                sources: Vec::new(),
            });
        }

        tracing::debug!(
            chunks = results.len(),
            sources = built.sources.len(),
            context_chars = built.context.len(),
            "Generating answer"
        );

        let messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "Sources:\n{}\n\nQuestion: {}",
                built.context, query
            )),
        ];
        let answer = self.llm.chat(messages).await?;

        Ok(RagResponse {
            answer: answer.trim().to_string(),
            sources: built.sources,
        })
    }

    pub async fn check_api(&self) -> bool {
        self.llm.check_api().await
    }
}
