use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;
use crate::rag::Source;
use crate::state::AppState;

const DEFAULT_NUM_RESULTS: i64 = 5;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub num_results: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub answer: String,
    pub sources: Vec<Source>,
    pub from_cache: bool,
}

/// Answer from cached documents when any match, otherwise crawl, store and
/// answer from the fresh documents.
pub async fn search_and_answer(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let query = request.query.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("Query must not be empty".to_string()));
    }
    let num_results = validate_num_results(request.num_results, state.settings.search.max_results)?;

    tracing::info!(query, num_results, "Processing search request");

    let cached = state.database.search(query, num_results).await?;
    if !cached.is_empty() {
        tracing::info!(matches = cached.len(), "Answering from stored documents");
        let response = state.rag.generate_response_with_sources(query).await?;
        return Ok(Json(SearchResponse {
            answer: response.answer,
            sources: response.sources,
            from_cache: true,
        }));
    }

    let documents = state.crawler.search_and_crawl(query, num_results).await?;
    if documents.is_empty() {
        return Err(ApiError::NotFound("No relevant documents found".to_string()));
    }

    let stored = state.database.add_documents(&documents).await?;
    tracing::info!(crawled = documents.len(), stored, "Stored crawled documents");

    let response = state.rag.generate_response_with_sources(query).await?;
    Ok(Json(SearchResponse {
        answer: response.answer,
        sources: response.sources,
        from_cache: false,
    }))
}

fn validate_num_results(requested: Option<i64>, max_results: usize) -> Result<usize, ApiError> {
    let value = requested.unwrap_or(DEFAULT_NUM_RESULTS);
    match usize::try_from(value) {
        Ok(n) if (1..=max_results).contains(&n) => Ok(n),
        _ => Err(ApiError::BadRequest(format!(
            "num_results must be between 1 and {}",
            max_results
        ))),
    }
}
