//! Fakes behind the provider and crawler seams, shared by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use axum::Router;
use tempfile::TempDir;

use crate::core::errors::ApiError;
use crate::crawler::Crawler;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};
use crate::rag::{Document, SqliteVectorStore};

const EMBEDDING_DIMS: usize = 512;

/// A store in a fresh temporary directory; keep the `TempDir` alive as long
/// as the store is used.
pub async fn temp_store() -> (TempDir, SqliteVectorStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteVectorStore::with_path(dir.path().join("rag.db"))
        .await
        .unwrap();
    (dir, store)
}

/// Serves the router built by `build` on an ephemeral local port and returns
/// its base URL, which `build` also receives.
pub async fn serve_local<F>(build: F) -> String
where
    F: FnOnce(&str) -> Router,
{
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let app = build(&base);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    base
}

/// Bag-of-words embeddings where every distinct lowercase word owns one
/// dimension, so identical texts score 1.0 and disjoint texts score 0.0.
pub struct FakeProvider {
    healthy: AtomicBool,
    fail_chat: AtomicBool,
    embed_calls: AtomicUsize,
    chat_calls: AtomicUsize,
    vocabulary: Mutex<HashMap<String, usize>>,
    last_chat_model: Mutex<Option<String>>,
    last_messages: Mutex<Vec<ChatMessage>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            healthy: AtomicBool::new(true),
            fail_chat: AtomicBool::new(false),
            embed_calls: AtomicUsize::new(0),
            chat_calls: AtomicUsize::new(0),
            vocabulary: Mutex::new(HashMap::new()),
            last_chat_model: Mutex::new(None),
            last_messages: Mutex::new(Vec::new()),
        }
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn set_fail_chat(&self, fail: bool) {
        self.fail_chat.store(fail, Ordering::SeqCst);
    }

    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    pub fn chat_calls(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    pub fn last_chat_model(&self) -> Option<String> {
        self.last_chat_model.lock().unwrap().clone()
    }

    pub fn last_messages(&self) -> Vec<ChatMessage> {
        self.last_messages.lock().unwrap().clone()
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vocabulary = self.vocabulary.lock().unwrap();
        let mut vector = vec![0.0; EMBEDDING_DIMS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let next = vocabulary.len();
            let dim = *vocabulary.entry(word.to_lowercase()).or_insert(next);
            vector[dim % EMBEDDING_DIMS] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl LlmProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        Ok(self.healthy.load(Ordering::SeqCst))
    }

    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, ApiError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_chat_model.lock().unwrap() = Some(model_id.to_string());
        *self.last_messages.lock().unwrap() = request.messages;
        if self.fail_chat.load(Ordering::SeqCst) {
            return Err(ApiError::Internal("model quota exceeded".to_string()));
        }
        Ok("Generated answer [1]".to_string())
    }

    async fn embed(&self, inputs: &[String], _model_id: &str) -> Result<Vec<Vec<f32>>, ApiError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        Ok(inputs.iter().map(|text| self.embed_text(text)).collect())
    }
}

/// Crawler returning a fixed document list.
pub struct FakeCrawler {
    documents: Mutex<Vec<Document>>,
    calls: AtomicUsize,
}

impl FakeCrawler {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents: Mutex::new(documents),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Crawler for FakeCrawler {
    async fn search_and_crawl(
        &self,
        _query: &str,
        num_results: usize,
    ) -> Result<Vec<Document>, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let documents = self.documents.lock().unwrap();
        Ok(documents.iter().take(num_results).cloned().collect())
    }
}
