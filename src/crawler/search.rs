use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::core::config::SearchSettings;
use crate::core::errors::ApiError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Run the configured provider, falling back to DuckDuckGo when it is not
/// configured, fails, or returns nothing.
pub async fn perform_search(
    client: &Client,
    settings: &SearchSettings,
    query: &str,
) -> Result<Vec<SearchResult>, ApiError> {
    let endpoints = &settings.endpoints;
    let preferred = match settings.provider.as_str() {
        "google" => match (
            non_empty(&settings.google_search_api_key),
            non_empty(&settings.google_search_engine_id),
        ) {
            (Some(key), Some(engine_id)) => {
                Some(google_search(client, &endpoints.google, query, key, engine_id).await)
            }
            _ => None,
        },
        "brave" => match non_empty(&settings.brave_search_api_key) {
            Some(key) => Some(brave_search(client, &endpoints.brave, query, key).await),
            None => None,
        },
        "bing" => match non_empty(&settings.bing_search_api_key) {
            Some(key) => Some(bing_search(client, &endpoints.bing, query, key).await),
            None => None,
        },
        _ => None,
    };

    match preferred {
        Some(Ok(results)) if !results.is_empty() => return Ok(results),
        Some(Ok(_)) => {
            tracing::info!(provider = %settings.provider, "Search provider returned no results");
        }
        Some(Err(err)) => {
            tracing::warn!(provider = %settings.provider, error = %err, "Search provider failed");
        }
        None if settings.provider != "duckduckgo" => {
            tracing::debug!(provider = %settings.provider, "Search provider not configured");
        }
        None => {}
    }

    duckduckgo_search(client, &endpoints.duckduckgo, query).await
}

fn non_empty(value: &str) -> Option<&str> {
    Some(value.trim()).filter(|v| !v.is_empty())
}

async fn fetch_json(
    request: reqwest::RequestBuilder,
    provider: &str,
) -> Result<Value, ApiError> {
    let response = request.send().await.map_err(ApiError::internal)?;

    if !response.status().is_success() {
        return Err(ApiError::Internal(format!(
            "{} search failed: {}",
            provider,
            response.status()
        )));
    }

    response.json().await.map_err(ApiError::internal)
}

async fn google_search(
    client: &Client,
    endpoint: &str,
    query: &str,
    api_key: &str,
    engine_id: &str,
) -> Result<Vec<SearchResult>, ApiError> {
    let url = format!(
        "{}?key={}&cx={}&q={}",
        endpoint,
        urlencoding::encode(api_key),
        urlencoding::encode(engine_id),
        urlencoding::encode(query)
    );
    let payload = fetch_json(client.get(url), "Google").await?;
    Ok(parse_google(&payload))
}

async fn duckduckgo_search(
    client: &Client,
    endpoint: &str,
    query: &str,
) -> Result<Vec<SearchResult>, ApiError> {
    let url = format!(
        "{}?q={}&format=json&no_redirect=1&no_html=1",
        endpoint,
        urlencoding::encode(query)
    );
    let payload = fetch_json(client.get(url), "DuckDuckGo").await?;
    Ok(parse_duckduckgo(&payload))
}

async fn brave_search(
    client: &Client,
    endpoint: &str,
    query: &str,
    api_key: &str,
) -> Result<Vec<SearchResult>, ApiError> {
    let url = format!("{}?q={}", endpoint, urlencoding::encode(query));
    let request = client
        .get(url)
        .header("X-Subscription-Token", api_key)
        .header("Accept", "application/json");
    let payload = fetch_json(request, "Brave").await?;
    Ok(parse_brave(&payload))
}

async fn bing_search(
    client: &Client,
    endpoint: &str,
    query: &str,
    api_key: &str,
) -> Result<Vec<SearchResult>, ApiError> {
    let url = format!("{}?q={}", endpoint, urlencoding::encode(query));
    let request = client.get(url).header("Ocp-Apim-Subscription-Key", api_key);
    let payload = fetch_json(request, "Bing").await?;
    Ok(parse_bing(&payload))
}

fn str_field<'a>(item: &'a Value, key: &str) -> &'a str {
    item.get(key).and_then(|v| v.as_str()).unwrap_or("")
}

fn collect_items(items: Option<&Vec<Value>>, title: &str, url: &str, snippet: &str) -> Vec<SearchResult> {
    let mut results = Vec::new();
    for item in items.map(|v| v.as_slice()).unwrap_or_default() {
        let item_title = str_field(item, title);
        let item_url = str_field(item, url);
        if item_title.is_empty() || item_url.is_empty() {
            continue;
        }
        results.push(SearchResult {
            title: item_title.to_string(),
            url: item_url.to_string(),
            snippet: str_field(item, snippet).to_string(),
        });
    }
    results
}

pub(crate) fn parse_google(payload: &Value) -> Vec<SearchResult> {
    collect_items(
        payload.get("items").and_then(|v| v.as_array()),
        "title",
        "link",
        "snippet",
    )
}

pub(crate) fn parse_brave(payload: &Value) -> Vec<SearchResult> {
    collect_items(
        payload
            .get("web")
            .and_then(|w| w.get("results"))
            .and_then(|v| v.as_array()),
        "title",
        "url",
        "description",
    )
}

pub(crate) fn parse_bing(payload: &Value) -> Vec<SearchResult> {
    collect_items(
        payload
            .get("webPages")
            .and_then(|wp| wp.get("value"))
            .and_then(|v| v.as_array()),
        "name",
        "url",
        "snippet",
    )
}

pub(crate) fn parse_duckduckgo(payload: &Value) -> Vec<SearchResult> {
    let mut results = Vec::new();

    let abstract_text = str_field(payload, "AbstractText");
    let abstract_url = str_field(payload, "AbstractURL");
    if !abstract_text.is_empty() && !abstract_url.is_empty() {
        let heading = str_field(payload, "Heading");
        results.push(SearchResult {
            title: if heading.is_empty() {
                topic_title(abstract_text)
            } else {
                heading.to_string()
            },
            url: abstract_url.to_string(),
            snippet: abstract_text.to_string(),
        });
    }

    if let Some(items) = payload.get("Results").and_then(|v| v.as_array()) {
        extract_ddg_topics(items, &mut results);
    }
    if let Some(items) = payload.get("RelatedTopics").and_then(|v| v.as_array()) {
        extract_ddg_topics(items, &mut results);
    }

    results
}

fn topic_title(text: &str) -> String {
    text.split(" - ").next().unwrap_or(text).to_string()
}

fn extract_ddg_topics(items: &[Value], results: &mut Vec<SearchResult>) {
    for item in items {
        if let Some(topics) = item.get("Topics").and_then(|v| v.as_array()) {
            extract_ddg_topics(topics, results);
            continue;
        }
        let text = str_field(item, "Text");
        let url = str_field(item, "FirstURL");
        if text.is_empty() || url.is_empty() {
            continue;
        }
        results.push(SearchResult {
            title: topic_title(text),
            url: url.to_string(),
            snippet: text.to_string(),
        });
    }
}
