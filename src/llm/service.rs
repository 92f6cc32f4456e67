use std::sync::Arc;

use crate::core::config::LlmSettings;
use crate::core::errors::ApiError;
use crate::llm::provider::LlmProvider;
use crate::llm::types::{ChatMessage, ChatRequest};

/// Model-aware front for an [`LlmProvider`]: applies configured model names,
/// sampling options and embedding batch size.
#[derive(Clone)]
pub struct LlmService {
    provider: Arc<dyn LlmProvider>,
    settings: Arc<LlmSettings>,
}

impl LlmService {
    pub fn new(provider: Arc<dyn LlmProvider>, settings: LlmSettings) -> Self {
        Self {
            provider,
            settings: Arc::new(settings),
        }
    }

    pub fn embedding_model(&self) -> &str {
        &self.settings.embedding_model
    }

    pub async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, ApiError> {
        let request = ChatRequest::new(messages).with_settings(&self.settings);
        self.provider.chat(request, &self.settings.chat_model).await
    }

    pub async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        let batch_size = self.settings.embedding_batch_size.max(1);
        let mut embeddings = Vec::with_capacity(inputs.len());

        for batch in inputs.chunks(batch_size) {
            let vectors = self
                .provider
                .embed(batch, &self.settings.embedding_model)
                .await?;
            if vectors.len() != batch.len() {
                return Err(ApiError::Internal(format!(
                    "Embedding provider returned {} vectors for {} inputs",
                    vectors.len(),
                    batch.len()
                )));
            }
            embeddings.extend(vectors);
        }

        Ok(embeddings)
    }

    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>, ApiError> {
        self.embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Internal("Embedding provider returned no vector".to_string()))
    }

    /// Connectivity probe; transport failures count as disconnected.
    pub async fn check_api(&self) -> bool {
        match self.provider.health_check().await {
            Ok(healthy) => healthy,
            Err(err) => {
                tracing::warn!(provider = self.provider.name(), error = %err, "LLM health check failed");
                false
            }
        }
    }
}
