use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::Instrument;
use uuid::Uuid;

use crate::core::config::service::{is_sensitive_key, redacted_placeholder};
use crate::core::errors::{ApiError, ErrorDetail};
use crate::state::AppState;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
const GENERIC_INTERNAL_DETAIL: &str = "Internal server error";

/// Correlation id for one HTTP request, available as a request extension.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
}

/// Assigns a request id, wraps the handler in a span carrying it, and
/// rewrites error bodies to `{detail, request_id}`.
pub async fn request_context(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        uri = %request.uri()
    );
    request.extensions_mut().insert(RequestContext {
        request_id: request_id.clone(),
    });

    async move {
        tracing::info!(headers = ?redacted_headers(request.headers()), "Incoming request");
        let started = Instant::now();

        let response = next.run(request).await;
        let mut response = render_error(response, &request_id, state.settings.debug);

        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response
                .headers_mut()
                .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
        }

        tracing::info!(
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Request completed"
        );
        response
    }
    .instrument(span)
    .await
}

fn render_error(response: Response, request_id: &str, debug: bool) -> Response {
    let Some(detail) = response.extensions().get::<ErrorDetail>().cloned() else {
        return response;
    };

    let status = response.status();
    let public_detail = if status.is_server_error() {
        tracing::error!(status = status.as_u16(), error = %detail.message, "Request failed");
        if debug {
            detail.message
        } else {
            GENERIC_INTERNAL_DETAIL.to_string()
        }
    } else {
        tracing::warn!(status = status.as_u16(), error = %detail.message, "Request rejected");
        detail.message
    };

    let (parts, _) = response.into_parts();
    let mut rendered = Json(json!({
        "detail": public_detail,
        "request_id": request_id,
    }))
    .into_response();
    *rendered.status_mut() = parts.status;
    for (name, value) in parts.headers.iter() {
        if name != CONTENT_LENGTH && name != CONTENT_TYPE {
            rendered.headers_mut().append(name.clone(), value.clone());
        }
    }
    rendered
}

fn redacted_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            let shown = if is_sensitive_key(name.as_str()) {
                redacted_placeholder().to_string()
            } else {
                value.to_str().unwrap_or("<binary>").to_string()
            };
            (name.as_str().to_string(), shown)
        })
        .collect()
}

/// Converts a handler panic into the regular 500 error response.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };
    ApiError::Internal(format!("panic: {}", message)).into_response()
}
