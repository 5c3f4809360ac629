//! HTTP route handlers: health, transitions, document CRUD, workflow.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use boletin_core::{workflow, Actor, Document, DocumentDraft, DocumentFilter, WorkflowState};
use boletin_engine::EngineError;
use boletin_storage::{DocumentUpdate, StorageError};

use super::state::AppState;
use super::json_error;

/// Wrap a successful payload in the standard envelope.
fn json_ok(message: &str, data: serde_json::Value) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "success": true,
            "message": message,
            "data": data,
        })),
    )
}

/// Map an executor error onto an HTTP status and envelope message.
fn engine_error_response(err: EngineError) -> axum::response::Response {
    match err {
        EngineError::Workflow(ref e) => {
            // "invalid transition from X to Y": the one workflow error
            json_error(StatusCode::BAD_REQUEST, &e.to_string()).into_response()
        }
        EngineError::Storage(StorageError::DocumentNotFound { document_id }) => json_error(
            StatusCode::NOT_FOUND,
            &format!("document '{}' not found", document_id),
        )
        .into_response(),
        EngineError::Storage(StorageError::ConcurrentConflict { document_id, .. }) => json_error(
            StatusCode::CONFLICT,
            &format!("document '{}' was modified concurrently, retry", document_id),
        )
        .into_response(),
        EngineError::Storage(StorageError::AlreadyExists { document_id }) => json_error(
            StatusCode::CONFLICT,
            &format!("document '{}' already exists", document_id),
        )
        .into_response(),
        EngineError::Storage(StorageError::Backend(msg)) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, &msg).into_response()
        }
    }
}

/// The actor performing a request, from X-User-Id / X-User-Role headers.
/// Defaults match the portal frontend's session principal.
fn actor_from_headers(headers: &HeaderMap) -> Actor {
    let user_id = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .unwrap_or("current-user");
    let user_role = headers
        .get("x-user-role")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .unwrap_or("ADMIN");
    Actor::new(user_id, user_role)
}

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health() -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(response))
}

/// GET /workflow/transitions/{state}
pub(crate) async fn handle_allowed_transitions(Path(state): Path<String>) -> impl IntoResponse {
    let from: WorkflowState = match state.parse() {
        Ok(s) => s,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, &e).into_response(),
    };

    let targets: Vec<&str> = workflow::allowed_transitions(from)
        .iter()
        .map(|s| s.as_str())
        .collect();
    json_ok(
        "Allowed transitions",
        serde_json::json!({
            "state": from.as_str(),
            "allowed": targets,
        }),
    )
    .into_response()
}

/// Query parameters accepted by GET /documents.
#[derive(Deserialize)]
pub(crate) struct ListQuery {
    #[serde(rename = "type")]
    doc_type: Option<String>,
    state: Option<String>,
    search: Option<String>,
    date_from: Option<String>,
    date_to: Option<String>,
}

/// GET /documents
pub(crate) async fn handle_list_documents(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let mut filter = DocumentFilter {
        search_text: query.search,
        date_from: query.date_from,
        date_to: query.date_to,
        ..DocumentFilter::default()
    };

    if let Some(raw) = &query.doc_type {
        match raw.parse() {
            Ok(t) => filter.doc_type = Some(t),
            Err(e) => return json_error(StatusCode::BAD_REQUEST, &e).into_response(),
        }
    }
    if let Some(raw) = &query.state {
        match raw.parse() {
            Ok(s) => filter.state = Some(s),
            Err(e) => return json_error(StatusCode::BAD_REQUEST, &e).into_response(),
        }
    }

    match boletin_engine::list_documents(&state.storage, &filter).await {
        Ok(docs) => {
            let count = docs.len();
            json_ok(
                "Documents retrieved",
                serde_json::json!({
                    "documents": docs,
                    "count": count,
                }),
            )
            .into_response()
        }
        Err(e) => engine_error_response(e),
    }
}

/// POST /documents
pub(crate) async fn handle_create_document(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(parsed): Json<serde_json::Value>,
) -> impl IntoResponse {
    let draft: DocumentDraft = match serde_json::from_value(parsed) {
        Ok(d) => d,
        Err(e) => {
            return json_error(StatusCode::BAD_REQUEST, &format!("invalid document: {}", e))
                .into_response()
        }
    };

    let actor = actor_from_headers(&headers);
    match boletin_engine::create_document(&state.storage, draft, &actor).await {
        Ok(doc) => {
            let data = match serde_json::to_value(&doc) {
                Ok(v) => v,
                Err(e) => {
                    return json_error(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        &format!("serialization error: {}", e),
                    )
                    .into_response()
                }
            };
            (
                StatusCode::CREATED,
                Json(serde_json::json!({
                    "success": true,
                    "message": "Document created",
                    "data": data,
                })),
            )
                .into_response()
        }
        Err(e) => engine_error_response(e),
    }
}

/// GET /documents/{id}
pub(crate) async fn handle_get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match boletin_engine::get_document(&state.storage, &id).await {
        Ok(doc) => document_ok("Document retrieved", &doc),
        Err(e) => engine_error_response(e),
    }
}

/// PUT /documents/{id}
pub(crate) async fn handle_update_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(parsed): Json<serde_json::Value>,
) -> impl IntoResponse {
    let fields: DocumentUpdate = match serde_json::from_value(parsed) {
        Ok(f) => f,
        Err(e) => {
            return json_error(StatusCode::BAD_REQUEST, &format!("invalid document: {}", e))
                .into_response()
        }
    };

    match boletin_engine::update_document(&state.storage, &id, fields).await {
        Ok(doc) => document_ok("Document updated", &doc),
        Err(e) => engine_error_response(e),
    }
}

/// POST /documents/{id}/transition
pub(crate) async fn handle_transition(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(parsed): Json<serde_json::Value>,
) -> impl IntoResponse {
    let to_state: WorkflowState = match parsed.get("to_state").and_then(|v| v.as_str()) {
        Some(raw) => match raw.parse() {
            Ok(s) => s,
            Err(e) => return json_error(StatusCode::BAD_REQUEST, &e).into_response(),
        },
        None => {
            return json_error(StatusCode::BAD_REQUEST, "missing 'to_state' field")
                .into_response()
        }
    };
    let notes = parsed
        .get("notes")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    let actor = actor_from_headers(&headers);
    match boletin_engine::transition_document(&state.storage, &id, to_state, &actor, notes).await {
        Ok(doc) => document_ok("Transition applied", &doc),
        Err(e) => engine_error_response(e),
    }
}

/// GET /documents/{id}/history
pub(crate) async fn handle_get_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match boletin_engine::get_document(&state.storage, &id).await {
        Ok(doc) => {
            let data = match serde_json::to_value(&doc.history) {
                Ok(v) => v,
                Err(e) => {
                    return json_error(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        &format!("serialization error: {}", e),
                    )
                    .into_response()
                }
            };
            json_ok("History retrieved", data).into_response()
        }
        Err(e) => engine_error_response(e),
    }
}

/// Serialize a document into a 200 envelope response.
fn document_ok(message: &str, doc: &Document) -> axum::response::Response {
    match serde_json::to_value(doc) {
        Ok(data) => json_ok(message, data).into_response(),
        Err(e) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("serialization error: {}", e),
        )
        .into_response(),
    }
}
