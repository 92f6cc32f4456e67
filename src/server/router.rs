use std::sync::Arc;

use axum::extract::Request;
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::handlers::{documents, health, logs, root, search};
use crate::server::middleware::{panic_response, request_context, RequestContext, REQUEST_ID_HEADER};
use crate::state::AppState;

/// Creates the application router with all routes and middleware.
///
/// Layer order, innermost first: panic capture, tracing, request context, CORS.
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state.settings.server.cors_allowed_origins);
    Router::new()
        .route("/", get(root::root))
        .route("/search", post(search::search_and_answer))
        .route(
            "/documents",
            get(documents::list_documents).delete(documents::clear_documents),
        )
        .route("/health", get(health::health))
        .route("/debug/logs", get(logs::recent_logs))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http().make_span_with(http_span))
        .layer(from_fn_with_state(state.clone(), request_context))
        .with_state(state)
        .layer(cors_layer)
}

fn http_span(request: &Request) -> tracing::Span {
    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|context| context.request_id.as_str())
        .unwrap_or_default();
    tracing::debug_span!(
        "http",
        request_id,
        method = %request.method(),
        uri = %request.uri(),
        version = ?request.version()
    )
}

fn build_cors_layer(configured: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)]);

    match resolve_allowed_origins(configured) {
        None => base.allow_origin(Any).allow_headers(Any),
        Some(origins) => base
            .allow_origin(AllowOrigin::list(origins))
            .allow_headers([header::ACCEPT, header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_credentials(true),
    }
}

/// `None` means any origin: the list is empty or contains `*`.
fn resolve_allowed_origins(configured: &[String]) -> Option<Vec<HeaderValue>> {
    let origins: Vec<&str> = configured
        .iter()
        .map(|origin| origin.trim())
        .filter(|origin| !origin.is_empty())
        .collect();

    if origins.is_empty() || origins.contains(&"*") {
        return None;
    }

    let values: Vec<HeaderValue> = origins
        .into_iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}
