//! The transition executor.
//!
//! Each operation is one storage snapshot: begin, stage the writes, commit.
//! Any failure aborts the snapshot and leaves the document untouched.

use uuid::Uuid;

use boletin_core::{
    workflow, Actor, Document, DocumentDraft, DocumentFilter, WorkflowError, WorkflowState,
};
use boletin_storage::{DocumentStorage, DocumentUpdate, TransitionRow};

use crate::assemble::{assemble_document, record_from_document, row_from_transition};
use crate::error::EngineError;

/// Create a document: insert the row plus its synthetic creation
/// transition (`from_state` NULL, `to_state` DRAFT) in one snapshot.
pub async fn create_document<S: DocumentStorage>(
    storage: &S,
    draft: DocumentDraft,
    actor: &Actor,
) -> Result<Document, EngineError> {
    let now = now_rfc3339();
    let doc = Document::create(Uuid::new_v4().to_string(), draft, actor, &now);

    let mut snapshot = storage.begin_snapshot().await?;
    if let Err(e) = storage
        .insert_document(&mut snapshot, record_from_document(&doc))
        .await
    {
        let _ = storage.abort_snapshot(snapshot).await;
        return Err(e.into());
    }
    let creation = row_from_transition(Uuid::new_v4().to_string(), &doc.id, &doc.history[0]);
    if let Err(e) = storage.insert_transition(&mut snapshot, creation).await {
        let _ = storage.abort_snapshot(snapshot).await;
        return Err(e.into());
    }
    storage.commit_snapshot(snapshot).await?;
    Ok(doc)
}

/// Apply a validated workflow transition.
///
/// 1. Read the document row (for update)
/// 2. Validate `to_state` against the adjacency table
/// 3. Insert the audit row and version-check the state update
/// 4. Commit
///
/// Fails with `EngineError::Workflow(InvalidTransition)` when the target is
/// not reachable, and `EngineError::Storage(ConcurrentConflict)` when a
/// racing transition committed first; in both cases nothing is persisted.
pub async fn transition_document<S: DocumentStorage>(
    storage: &S,
    document_id: &str,
    to_state: WorkflowState,
    actor: &Actor,
    notes: Option<String>,
) -> Result<Document, EngineError> {
    let mut snapshot = storage.begin_snapshot().await?;

    let current = match storage.get_document_for_update(&mut snapshot, document_id).await {
        Ok(rec) => rec,
        Err(e) => {
            let _ = storage.abort_snapshot(snapshot).await;
            return Err(e.into());
        }
    };

    if !workflow::is_allowed(current.state, to_state) {
        let _ = storage.abort_snapshot(snapshot).await;
        return Err(WorkflowError::InvalidTransition {
            from: current.state,
            to: to_state,
        }
        .into());
    }

    let now = now_rfc3339();
    let row = TransitionRow {
        id: Uuid::new_v4().to_string(),
        document_id: document_id.to_string(),
        from_state: Some(current.state),
        to_state,
        timestamp: now.clone(),
        user_id: actor.user_id.clone(),
        user_role: actor.user_role.clone(),
        notes,
    };
    if let Err(e) = storage.insert_transition(&mut snapshot, row).await {
        let _ = storage.abort_snapshot(snapshot).await;
        return Err(e.into());
    }

    if let Err(e) = storage
        .update_document_state(&mut snapshot, document_id, current.version, to_state, &now)
        .await
    {
        let _ = storage.abort_snapshot(snapshot).await;
        return Err(e.into());
    }

    storage.commit_snapshot(snapshot).await?;
    get_document(storage, document_id).await
}

/// Replace a document's descriptive fields. Never touches workflow state;
/// state changes only go through [`transition_document`].
pub async fn update_document<S: DocumentStorage>(
    storage: &S,
    document_id: &str,
    fields: DocumentUpdate,
) -> Result<Document, EngineError> {
    let now = now_rfc3339();
    let mut snapshot = storage.begin_snapshot().await?;
    if let Err(e) = storage
        .update_document_fields(&mut snapshot, document_id, fields, &now)
        .await
    {
        let _ = storage.abort_snapshot(snapshot).await;
        return Err(e.into());
    }
    storage.commit_snapshot(snapshot).await?;
    get_document(storage, document_id).await
}

/// Fetch one document with its full history.
pub async fn get_document<S: DocumentStorage>(
    storage: &S,
    document_id: &str,
) -> Result<Document, EngineError> {
    let record = storage.get_document(document_id).await?;
    let rows = storage.list_transitions(document_id).await?;
    Ok(assemble_document(record, rows))
}

/// List documents matching the filter, each with its history, ordered by
/// publication date descending.
pub async fn list_documents<S: DocumentStorage>(
    storage: &S,
    filter: &DocumentFilter,
) -> Result<Vec<Document>, EngineError> {
    let records = storage.list_documents(filter).await?;
    let mut documents = Vec::with_capacity(records.len());
    for record in records {
        let rows = storage.list_transitions(&record.id).await?;
        documents.push(assemble_document(record, rows));
    }
    Ok(documents)
}

/// Current time as an RFC 3339 timestamp (second precision).
fn now_rfc3339() -> String {
    let now = time::OffsetDateTime::now_utc();
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        now.year(),
        now.month() as u8,
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    )
}
