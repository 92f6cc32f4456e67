use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn recent_logs(State(state): State<Arc<AppState>>) -> Json<Value> {
    if !state.settings.debug {
        return Json(json!({ "message": "Debug mode not enabled" }));
    }
    Json(json!({ "logs": state.recent_logs.snapshot() }))
}
