use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use crate::core::config::{AppPaths, Settings};
use crate::core::logging::RecentLogs;
use crate::rag::{Document, SqliteVectorStore};
use crate::server::middleware::REQUEST_ID_HEADER;
use crate::server::router::router;
use crate::state::AppState;
use crate::test_support::{temp_store, FakeCrawler, FakeProvider};

struct Harness {
    state: Arc<AppState>,
    store: Arc<SqliteVectorStore>,
    provider: Arc<FakeProvider>,
    crawler: Arc<FakeCrawler>,
    _dir: TempDir,
}

impl Harness {
    async fn new(crawled: Vec<Document>) -> Self {
        Self::with_settings(crawled, Settings::default()).await
    }

    async fn with_settings(crawled: Vec<Document>, settings: Settings) -> Self {
        let (dir, store) = temp_store().await;
        let store = Arc::new(store);
        let provider = Arc::new(FakeProvider::new());
        let crawler = Arc::new(FakeCrawler::new(crawled));
        let recent_logs = RecentLogs::new(50);
        recent_logs.push_line(r#"{"level":"INFO","message":"started"}"#);
        let paths = Arc::new(AppPaths::with_data_dir(
            dir.path().to_path_buf(),
            dir.path().join("data"),
        ));

        let state = Arc::new(AppState::from_parts(
            paths,
            settings,
            store.clone(),
            provider.clone(),
            crawler.clone(),
            recent_logs,
        ));
        Self {
            state,
            store,
            provider,
            crawler,
            _dir: dir,
        }
    }

    fn app(&self) -> Router {
        router(self.state.clone())
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
        let response = self.app().oneshot(request).await.unwrap();
        let status = response.status();
        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .map(|v| v.to_str().unwrap().to_string());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, request_id, json)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Option<String>, Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn delete(&self, uri: &str) -> (StatusCode, Option<String>, Value) {
        self.send(
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    async fn post_search(&self, body: String) -> (StatusCode, Option<String>, Value) {
        self.send(
            Request::builder()
                .method("POST")
                .uri("/search")
                .header("Content-Type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }
}

fn doc(url: &str, title: &str, content: &str) -> Document {
    Document {
        url: url.to_string(),
        title: title.to_string(),
        content: content.to_string(),
    }
}

#[tokio::test]
async fn cached_documents_answer_without_crawling() {
    let harness = Harness::new(vec![doc("https://crawled.dev", "Crawled", "unused")]).await;
    harness
        .state
        .database
        .add_documents(&[doc("https://rust.dev", "Rust", "rust ownership borrow checker")])
        .await
        .unwrap();

    let (status, _, body) = harness
        .post_search(json!({"query": "rust ownership"}).to_string())
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["from_cache"], true);
    assert_eq!(body["answer"], "Generated answer [1]");
    assert_eq!(body["sources"][0]["url"], "https://rust.dev");
    assert_eq!(body["sources"][0]["title"], "Rust");
    assert_eq!(harness.crawler.calls(), 0);
}

#[tokio::test]
async fn cache_miss_crawls_stores_and_then_serves_from_cache() {
    let harness = Harness::new(vec![doc(
        "https://tokio.rs",
        "Tokio",
        "tokio runtime async tasks",
    )])
    .await;

    let (status, _, body) = harness
        .post_search(json!({"query": "tokio runtime", "num_results": 3}).to_string())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["from_cache"], false);
    assert_eq!(body["sources"][0]["url"], "https://tokio.rs");
    assert_eq!(harness.crawler.calls(), 1);

    let (_, _, listing) = harness.get("/documents").await;
    let documents = listing["documents"].as_array().unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0]["url"], "https://tokio.rs");
    assert_eq!(documents[0]["preview"], "tokio runtime async tasks");
    assert_eq!(documents[0]["content_length"], 25);
    assert_eq!(documents[0]["chunk_count"], 1);

    let (_, _, again) = harness
        .post_search(json!({"query": "tokio runtime"}).to_string())
        .await;
    assert_eq!(again["from_cache"], true);
    assert_eq!(harness.crawler.calls(), 1);
}

#[tokio::test]
async fn empty_crawl_is_not_found_with_request_id() {
    let harness = Harness::new(Vec::new()).await;

    let (status, request_id, body) = harness
        .post_search(json!({"query": "nothing matches"}).to_string())
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "No relevant documents found");
    let request_id = request_id.unwrap();
    assert_eq!(body["request_id"], request_id.as_str());
    assert!(uuid::Uuid::parse_str(&request_id).is_ok());
}

#[tokio::test]
async fn invalid_search_requests_are_bad_requests() {
    let harness = Harness::new(Vec::new()).await;

    let (status, _, body) = harness.post_search(json!({"query": "   "}).to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Query must not be empty");

    let (status, _, body) = harness
        .post_search(json!({"query": "rust", "num_results": 0}).to_string())
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["request_id"].is_string());

    let (status, _, _) = harness.post_search("{not json".to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(harness.crawler.calls(), 0);
}

#[tokio::test]
async fn collaborator_failure_is_internal_error_without_detail() {
    let harness = Harness::new(Vec::new()).await;
    harness
        .state
        .database
        .add_documents(&[doc("https://rust.dev", "Rust", "rust ownership")])
        .await
        .unwrap();
    harness.provider.set_fail_chat(true);

    let (status, request_id, body) = harness
        .post_search(json!({"query": "rust ownership"}).to_string())
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"], "Internal server error");
    assert_eq!(body["request_id"], request_id.unwrap().as_str());
}

#[tokio::test]
async fn debug_mode_echoes_internal_error_text() {
    let settings = Settings {
        debug: true,
        ..Settings::default()
    };
    let harness = Harness::with_settings(Vec::new(), settings).await;
    harness
        .state
        .database
        .add_documents(&[doc("https://rust.dev", "Rust", "rust ownership")])
        .await
        .unwrap();
    harness.provider.set_fail_chat(true);

    let (_, _, body) = harness
        .post_search(json!({"query": "rust ownership"}).to_string())
        .await;
    assert!(body["detail"].as_str().unwrap().contains("model quota exceeded"));
}

#[tokio::test]
async fn clearing_documents_empties_the_listing() {
    let harness = Harness::new(Vec::new()).await;
    harness
        .state
        .database
        .add_documents(&[
            doc("https://a.dev", "A", "alpha"),
            doc("https://b.dev", "B", "beta"),
        ])
        .await
        .unwrap();

    let (status, _, body) = harness.delete("/documents").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "All documents cleared successfully");
    assert_eq!(body["deleted"], 2);

    let (_, _, listing) = harness.get("/documents").await;
    assert_eq!(listing["documents"], json!([]));
}

#[tokio::test]
async fn health_reports_each_dependency() {
    let harness = Harness::new(Vec::new()).await;

    let (status, _, body) = harness.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
    assert_eq!(body["openai_api"], "connected");
    assert!(body["timestamp"].is_string());

    harness.provider.set_healthy(false);
    let (_, _, body) = harness.get("/health").await;
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["openai_api"], "disconnected");

    harness.provider.set_healthy(true);
    harness.store.close().await;
    let (status, _, body) = harness.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["database"], "disconnected");
    assert_eq!(body["openai_api"], "connected");
}

#[tokio::test]
async fn debug_logs_require_debug_mode() {
    let harness = Harness::new(Vec::new()).await;
    let (_, _, body) = harness.get("/debug/logs").await;
    assert_eq!(body, json!({"message": "Debug mode not enabled"}));

    let settings = Settings {
        debug: true,
        ..Settings::default()
    };
    let harness = Harness::with_settings(Vec::new(), settings).await;
    let (_, _, body) = harness.get("/debug/logs").await;
    let logs = body["logs"].as_array().unwrap();
    assert_eq!(logs[0]["message"], "started");
}

#[tokio::test]
async fn every_response_carries_a_request_id() {
    let harness = Harness::new(Vec::new()).await;

    let (status, first, body) = harness.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

    let (_, second, _) = harness.get("/").await;
    assert!(first.is_some());
    assert_ne!(first, second);

    let (status, missing, _) = harness.get("/no-such-route").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(missing.is_some());
}

#[tokio::test]
async fn trace_layer_events_carry_the_request_id() {
    let logs = RecentLogs::new(200);
    let subscriber = tracing_subscriber::fmt()
        .json()
        .flatten_event(true)
        .with_current_span(true)
        .with_span_list(false)
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(logs.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let harness = Harness::new(Vec::new()).await;
    let (_, request_id, _) = harness.get("/").await;
    let request_id = request_id.unwrap();

    let finished: Vec<Value> = logs
        .snapshot()
        .into_iter()
        .filter(|line| line["message"] == "finished processing request")
        .collect();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0]["span"]["name"], "http");
    assert_eq!(finished[0]["span"]["request_id"], request_id.as_str());
}
