use std::sync::Arc;

use crate::core::config::{AppPaths, Settings};
use crate::core::logging::RecentLogs;
use crate::crawler::{Crawler, WebCrawler};
use crate::llm::{LlmProvider, LlmService, OpenAiProvider};
use crate::rag::{RagSystem, SqliteVectorStore, VectorDatabase, VectorStore};

pub mod error;

use error::InitializationError;

/// Application state shared by every route.
///
/// The vector database, RAG system and crawler are built once at start-up
/// and reused across requests.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub paths: Arc<AppPaths>,
    pub database: VectorDatabase,
    pub rag: RagSystem,
    pub crawler: Arc<dyn Crawler>,
    pub recent_logs: RecentLogs,
}

impl AppState {
    /// Opens the SQLite store under the data dir and wires the OpenAI
    /// provider and web crawler from settings.
    pub async fn initialize(
        paths: Arc<AppPaths>,
        settings: Settings,
        recent_logs: RecentLogs,
    ) -> Result<Arc<Self>, InitializationError> {
        let store = Arc::new(
            SqliteVectorStore::new(paths.as_ref())
                .await
                .map_err(|e| InitializationError::VectorStore(e.into()))?,
        );
        tracing::info!(path = %store.db_path().display(), "Vector store ready");

        let provider = Arc::new(
            OpenAiProvider::new(&settings.llm).map_err(|e| InitializationError::Llm(e.into()))?,
        );
        if settings.llm.api_key.is_empty() {
            tracing::warn!("No OpenAI API key configured; LLM calls will be unauthenticated");
        }

        let crawler = Arc::new(
            WebCrawler::new(&settings.search, &settings.crawler)
                .map_err(|e| InitializationError::Crawler(e.into()))?,
        );

        Ok(Arc::new(Self::from_parts(
            paths,
            settings,
            store,
            provider,
            crawler,
            recent_logs,
        )))
    }

    pub fn from_parts(
        paths: Arc<AppPaths>,
        settings: Settings,
        store: Arc<dyn VectorStore>,
        provider: Arc<dyn LlmProvider>,
        crawler: Arc<dyn Crawler>,
        recent_logs: RecentLogs,
    ) -> Self {
        let llm = LlmService::new(provider, settings.llm.clone());
        let database = VectorDatabase::new(store, llm.clone(), &settings.rag);
        let rag = RagSystem::new(database.clone(), llm, &settings.rag);

        Self {
            settings: Arc::new(settings),
            paths,
            database,
            rag,
            crawler,
            recent_logs,
        }
    }
}
