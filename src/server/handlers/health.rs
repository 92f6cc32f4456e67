use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// Always 200; the body reports which dependency is down.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let (database, openai_api) = tokio::join!(
        state.database.check_connection(),
        state.rag.check_api()
    );

    Json(json!({
        "status": if database && openai_api { "healthy" } else { "unhealthy" },
        "database": connection_label(database),
        "openai_api": connection_label(openai_api),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

fn connection_label(connected: bool) -> &'static str {
    if connected {
        "connected"
    } else {
        "disconnected"
    }
}
