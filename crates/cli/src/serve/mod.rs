//! `boletin serve` -- HTTP JSON API server for the document workflow.
//!
//! Exposes document CRUD and the workflow transition executor as an async
//! HTTP service using `axum` + `tokio`. Supports concurrent request
//! handling; racing transitions on one document are resolved by the
//! storage layer's version check.
//!
//! Security features:
//! - CORS headers on all responses (permissive for local dev)
//! - Per-IP rate limiting (default: 60 req/min, configurable)
//! - Optional API key authentication via BOLETIN_API_KEY env var
//!
//! Endpoints:
//! - GET  /health                          - Server status (exempt from auth)
//! - GET  /workflow/transitions/{state}    - Allowed targets for a state
//! - GET  /documents                       - List documents (filterable)
//! - POST /documents                       - Create a document in DRAFT
//! - GET  /documents/{id}                  - Fetch one document with history
//! - PUT  /documents/{id}                  - Replace descriptive fields
//! - POST /documents/{id}/transition       - Apply a workflow transition
//! - GET  /documents/{id}/history          - Transition history only
//!
//! All responses use Content-Type: application/json.

mod handlers;
mod middleware;
mod state;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{middleware as axum_middleware, Json, Router};
use tower_http::cors::{Any, CorsLayer};

use boletin_storage::MemoryStorage;

use self::handlers::{
    handle_allowed_transitions, handle_create_document, handle_get_document, handle_get_history,
    handle_health, handle_list_documents, handle_not_found, handle_transition,
    handle_update_document,
};
use self::middleware::{auth_middleware, rate_limit_middleware};
use self::state::{AppState, RateLimiter};

/// Maximum request body size: 10 MB.
const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Default rate limit: 60 requests per minute per IP.
const DEFAULT_RATE_LIMIT: u64 = 60;

/// Rate limit window duration in seconds (1 minute).
const RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Construct a JSON error response in the standard envelope.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (
        status,
        Json(serde_json::json!({
            "success": false,
            "message": message,
            "data": serde_json::Value::Null,
        })),
    )
}

/// Start the HTTP server on the given port.
///
/// Security:
/// - CORS: Permissive (`Any` origin) for local dev; tighten for production.
/// - Rate limit: Per-IP, configurable via BOLETIN_RATE_LIMIT (default 60 req/min).
/// - API key: If BOLETIN_API_KEY env var is set, all endpoints except /health require auth.
pub async fn start_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    // Rate limit: from BOLETIN_RATE_LIMIT env var, or default
    let rate_limit = std::env::var("BOLETIN_RATE_LIMIT")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_RATE_LIMIT);

    // API key: from BOLETIN_API_KEY env var (None = no auth)
    let api_key = std::env::var("BOLETIN_API_KEY")
        .ok()
        .filter(|k| !k.is_empty());

    if api_key.is_some() {
        eprintln!("API key authentication enabled");
    }
    eprintln!("Rate limit: {} requests per minute per IP", rate_limit);

    let state = Arc::new(AppState {
        storage: MemoryStorage::new(),
        rate_limiter: RateLimiter::new(rate_limit),
        api_key,
    });

    // CORS: permissive for local dev
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(handle_health))
        .route(
            "/workflow/transitions/{state}",
            get(handle_allowed_transitions),
        )
        .route(
            "/documents",
            get(handle_list_documents).post(handle_create_document),
        )
        .route(
            "/documents/{id}",
            get(handle_get_document).put(handle_update_document),
        )
        .route("/documents/{id}/transition", post(handle_transition))
        .route("/documents/{id}/history", get(handle_get_history))
        .fallback(handle_not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    eprintln!("Boletin workflow server listening on http://0.0.0.0:{}", port);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    eprintln!("\nServer shut down.");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
    eprintln!("\nReceived shutdown signal...");
}
