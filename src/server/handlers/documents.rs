use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::rag::StoredDocument;
use crate::state::AppState;

const LIST_LIMIT: usize = 100;
const PREVIEW_CHARS: usize = 300;

#[derive(Debug, Serialize)]
pub struct DocumentSummary {
    pub url: String,
    pub title: String,
    pub preview: String,
    pub content_length: usize,
    pub chunk_count: usize,
    pub created_at: String,
}

impl From<StoredDocument> for DocumentSummary {
    fn from(document: StoredDocument) -> Self {
        Self {
            preview: document.content.chars().take(PREVIEW_CHARS).collect(),
            content_length: document.content.chars().count(),
            url: document.url,
            title: document.title,
            chunk_count: document.chunk_count,
            created_at: document.created_at,
        }
    }
}

pub async fn list_documents(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let documents: Vec<DocumentSummary> = state
        .database
        .get_all_documents(LIST_LIMIT)
        .await?
        .into_iter()
        .map(DocumentSummary::from)
        .collect();

    Ok(Json(json!({ "documents": documents })))
}

pub async fn clear_documents(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let deleted = state.database.clear_documents().await?;
    tracing::info!(deleted, "Cleared stored documents");

    Ok(Json(json!({
        "message": "All documents cleared successfully",
        "deleted": deleted,
    })))
}
