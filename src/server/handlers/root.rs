use axum::Json;
use serde_json::{json, Value};

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Welcome to RAG Search API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "POST /search": "Search and get answers (checks stored documents first)",
            "GET /documents": "View stored documents",
            "DELETE /documents": "Clear stored documents",
            "GET /health": "Database and OpenAI API connectivity",
            "GET /debug/logs": "Recent log lines (debug mode only)",
            "GET /": "This welcome page",
        }
    }))
}
