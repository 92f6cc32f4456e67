//! Web search and page fetching for cache misses.

mod page;
mod search;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use url::Url;

use crate::core::config::{CrawlerSettings, SearchSettings};
use crate::core::errors::ApiError;
use crate::rag::Document;

use page::{extract_html, extract_plain, ExtractedPage};
use search::{perform_search, SearchResult};

#[async_trait]
pub trait Crawler: Send + Sync {
    /// Search the web for `query` and return up to `num_results` documents.
    async fn search_and_crawl(&self, query: &str, num_results: usize) -> Result<Vec<Document>, ApiError>;
}

pub struct WebCrawler {
    client: Client,
    search: Arc<SearchSettings>,
    settings: Arc<CrawlerSettings>,
}

impl WebCrawler {
    pub fn new(search: &SearchSettings, settings: &CrawlerSettings) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(ApiError::internal)?;

        Ok(Self::with_client(client, search, settings))
    }

    pub fn with_client(client: Client, search: &SearchSettings, settings: &CrawlerSettings) -> Self {
        Self {
            client,
            search: Arc::new(search.clone()),
            settings: Arc::new(settings.clone()),
        }
    }

    async fn fetch_page(&self, url: &str) -> Result<Option<ExtractedPage>, ApiError> {
        let response = self.client.get(url).send().await.map_err(ApiError::internal)?;
        if !response.status().is_success() {
            return Err(ApiError::Internal(format!("HTTP {}", response.status())));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/html")
            .to_ascii_lowercase();
        let max_chars = self.settings.max_content_chars;

        if content_type.starts_with("text/html") || content_type.starts_with("application/xhtml") {
            let body = response.text().await.map_err(ApiError::internal)?;
            Ok(Some(extract_html(&body, max_chars)))
        } else if content_type.starts_with("text/plain") {
            let body = response.text().await.map_err(ApiError::internal)?;
            Ok(Some(extract_plain(&body, max_chars)))
        } else {
            tracing::debug!(url, content_type = %content_type, "Skipping non-text page");
            Ok(None)
        }
    }

    async fn crawl_result(&self, result: SearchResult) -> Option<Document> {
        let page = match self.fetch_page(&result.url).await {
            Ok(page) => page,
            Err(err) => {
                tracing::warn!(url = %result.url, error = %err, "Failed to fetch page");
                None
            }
        };
        document_from(result, page, self.settings.max_content_chars)
    }
}

#[async_trait]
impl Crawler for WebCrawler {
    async fn search_and_crawl(&self, query: &str, num_results: usize) -> Result<Vec<Document>, ApiError> {
        let results = perform_search(&self.client, &self.search, query).await?;
        let targets = select_targets(results, num_results);
        tracing::info!(query, targets = targets.len(), "Crawling search results");

        let documents: Vec<Document> = stream::iter(targets)
            .map(|result| self.crawl_result(result))
            .buffered(self.settings.concurrency.max(1))
            .filter_map(|document| async move { document })
            .collect()
            .await;

        tracing::info!(query, documents = documents.len(), "Crawl finished");
        Ok(documents)
    }
}

/// Distinct http(s) results in search order, at most `limit`.
fn select_targets(results: Vec<SearchResult>, limit: usize) -> Vec<SearchResult> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter_map(|mut result| {
            let mut parsed = Url::parse(result.url.trim()).ok()?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return None;
            }
            parsed.set_fragment(None);
            result.url = parsed.to_string();
            seen.insert(result.url.clone()).then_some(result)
        })
        .take(limit)
        .collect()
}

/// Page text wins; the search snippet stands in when the page yielded nothing.
fn document_from(result: SearchResult, page: Option<ExtractedPage>, max_chars: usize) -> Option<Document> {
    let (page_title, page_text) = match page {
        Some(page) => (page.title, page.text),
        None => (None, String::new()),
    };

    let content = if page_text.trim().is_empty() {
        page::truncate_chars(&page::collapse_whitespace(&result.snippet), max_chars)
    } else {
        page_text
    };
    if content.is_empty() {
        return None;
    }

    let title = page_title
        .or_else(|| Some(result.title.trim().to_string()).filter(|t| !t.is_empty()))
        .unwrap_or_else(|| result.url.clone());

    Some(Document {
        url: result.url,
        title,
        content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, StatusCode};
    use axum::response::Html;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    use crate::core::config::SearchEndpoints;
    use crate::core::logging::RecentLogs;
    use crate::test_support::serve_local;

    fn result(url: &str, title: &str, snippet: &str) -> SearchResult {
        SearchResult {
            url: url.to_string(),
            title: title.to_string(),
            snippet: snippet.to_string(),
        }
    }

    #[test]
    fn select_targets_keeps_distinct_http_urls() {
        let targets = select_targets(
            vec![
                result("https://a.dev/page#intro", "A", ""),
                result("https://a.dev/page", "A again", ""),
                result("ftp://files.dev/x", "F", ""),
                result("not a url", "N", ""),
                result("http://b.dev/", "B", ""),
                result("https://c.dev/", "C", ""),
            ],
            2,
        );
        let urls: Vec<&str> = targets.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.dev/page", "http://b.dev/"]);
    }

    #[test]
    fn snippet_replaces_empty_page() {
        let doc = document_from(result("https://a.dev/", "A", "  snippet  text "), None, 100).unwrap();
        assert_eq!(doc.content, "snippet text");
        assert_eq!(doc.title, "A");
    }

    #[test]
    fn page_title_preferred_and_empty_results_dropped() {
        let page = ExtractedPage {
            title: Some("Page Title".to_string()),
            text: "body".to_string(),
        };
        let doc = document_from(result("https://a.dev/", "Search Title", "s"), Some(page), 100).unwrap();
        assert_eq!(doc.title, "Page Title");
        assert_eq!(doc.content, "body");

        assert!(document_from(result("https://a.dev/", "A", ""), None, 100).is_none());
    }

    #[test]
    fn missing_titles_fall_back_to_url() {
        let doc = document_from(result("https://a.dev/", " ", "snippet"), None, 100).unwrap();
        assert_eq!(doc.title, "https://a.dev/");
    }

    #[tokio::test]
    async fn crawl_reads_text_pages_and_survives_page_failures() {
        let base = serve_local(|base| {
            let topics = json!({"RelatedTopics": [
                {"Text": "Html page - markup", "FirstURL": format!("{}/html", base)},
                {"Text": "Plain page - text", "FirstURL": format!("{}/plain", base)},
                {"Text": "Pdf page - binary", "FirstURL": format!("{}/pdf", base)},
                {"Text": "Missing page - gone", "FirstURL": format!("{}/missing", base)},
            ]});
            Router::new()
                .route("/ddg", get(move || async move { Json(topics) }))
                .route(
                    "/html",
                    get(|| async { Html("<title>Html Title</title><p>Html body</p>") }),
                )
                .route(
                    "/plain",
                    get(|| async { ([(header::CONTENT_TYPE, "text/plain")], "plain   body") }),
                )
                .route(
                    "/pdf",
                    get(|| async { ([(header::CONTENT_TYPE, "application/pdf")], vec![0x25u8, 0x50]) }),
                )
                .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
        })
        .await;

        let search = SearchSettings {
            endpoints: SearchEndpoints {
                duckduckgo: format!("{}/ddg", base),
                ..SearchEndpoints::default()
            },
            ..SearchSettings::default()
        };
        let client = Client::builder().no_proxy().build().unwrap();
        let crawler = WebCrawler::with_client(client, &search, &CrawlerSettings::default());

        let logs = RecentLogs::new(50);
        let subscriber = tracing_subscriber::fmt()
            .json()
            .flatten_event(true)
            .with_writer(logs.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let documents = crawler.search_and_crawl("pages", 10).await.unwrap();

        let contents: Vec<(&str, &str)> = documents
            .iter()
            .map(|d| (d.title.as_str(), d.content.as_str()))
            .collect();
        assert_eq!(
            contents,
            vec![
                ("Html Title", "Html body"),
                ("Plain page", "plain body"),
                ("Pdf page", "Pdf page - binary"),
                ("Missing page", "Missing page - gone"),
            ]
        );

        let warnings: Vec<_> = logs
            .snapshot()
            .into_iter()
            .filter(|line| line["level"] == "WARN")
            .collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0]["message"], "Failed to fetch page");
        assert!(warnings[0]["url"].as_str().unwrap().ends_with("/missing"));
    }
}
