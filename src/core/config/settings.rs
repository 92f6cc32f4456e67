//! Typed view of the merged configuration.
//!
//! Every field has a default so an empty `config.yml` yields a runnable
//! service once `llm.api_key` is provided.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Enables `/debug/logs` and echoes internal error text to clients.
    pub debug: bool,
    pub server: ServerSettings,
    pub llm: LlmSettings,
    pub search: SearchSettings,
    pub crawler: CrawlerSettings,
    pub rag: RagSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// `["*"]` allows any origin without credentials.
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_allowed_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub api_key: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<i32>,
    pub embedding_batch_size: usize,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key: String::new(),
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            temperature: Some(0.2),
            max_tokens: Some(800),
            embedding_batch_size: 64,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// One of `duckduckgo`, `google`, `brave`, `bing`.
    pub provider: String,
    pub google_search_api_key: String,
    pub google_search_engine_id: String,
    pub brave_search_api_key: String,
    pub bing_search_api_key: String,
    /// Upper bound accepted for `num_results` on `/search`.
    pub max_results: usize,
    pub endpoints: SearchEndpoints,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            provider: "duckduckgo".to_string(),
            google_search_api_key: String::new(),
            google_search_engine_id: String::new(),
            brave_search_api_key: String::new(),
            bing_search_api_key: String::new(),
            max_results: 20,
            endpoints: SearchEndpoints::default(),
        }
    }
}

/// Provider API base URLs, overridable to route through a proxy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchEndpoints {
    pub duckduckgo: String,
    pub google: String,
    pub brave: String,
    pub bing: String,
}

impl Default for SearchEndpoints {
    fn default() -> Self {
        Self {
            duckduckgo: "https://api.duckduckgo.com/".to_string(),
            google: "https://www.googleapis.com/customsearch/v1".to_string(),
            brave: "https://api.search.brave.com/res/v1/web/search".to_string(),
            bing: "https://api.bing.microsoft.com/v7.0/search".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerSettings {
    pub timeout_secs: u64,
    pub concurrency: usize,
    pub max_content_chars: usize,
    pub user_agent: String,
}

impl Default for CrawlerSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            concurrency: 4,
            max_content_chars: 20_000,
            user_agent: format!("rag-search-api/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub max_chunks_per_document: usize,
    /// Chunks to retrieve as answer context.
    pub top_k: usize,
    pub max_context_chars: usize,
    /// Minimum cosine similarity for a stored chunk to count as a cache hit.
    pub cache_similarity_threshold: f32,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 100,
            max_chunks_per_document: 40,
            top_k: 5,
            max_context_chars: 6000,
            cache_similarity_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Lines kept in memory for `/debug/logs`.
    pub recent_capacity: usize,
    pub file_enabled: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            recent_capacity: 200,
            file_enabled: true,
        }
    }
}
