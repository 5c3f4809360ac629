use std::future::Future;

use super::{make_creation_transition, make_document, seed_document, TestResult};
use crate::{DocumentStorage, StorageError};

pub(super) async fn run_snapshot_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: DocumentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "snapshot",
        "insert_not_visible_before_commit",
        insert_not_visible_before_commit(factory).await,
    ));
    results.push(TestResult::from_result(
        "snapshot",
        "insert_not_visible_after_abort",
        insert_not_visible_after_abort(factory).await,
    ));
    results.push(TestResult::from_result(
        "snapshot",
        "insert_visible_after_commit",
        insert_visible_after_commit(factory).await,
    ));
    results.push(TestResult::from_result(
        "snapshot",
        "transition_rows_not_visible_before_commit",
        transition_rows_not_visible_before_commit(factory).await,
    ));
    results.push(TestResult::from_result(
        "snapshot",
        "staged_write_visible_inside_own_snapshot",
        staged_write_visible_inside_own_snapshot(factory).await,
    ));

    results
}

// ── Test implementations ──────────────────────────────────────────────────────

/// While a snapshot is open, its inserted document must NOT be visible to
/// read-path queries (get_document operates outside the snapshot).
async fn insert_not_visible_before_commit<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.insert_document(&mut snap, make_document("doc-1"))
        .await
        .map_err(|e| e.to_string())?;

    let result = s.get_document("doc-1").await;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;

    match result {
        Err(ref e) if matches!(e, StorageError::DocumentNotFound { .. }) => Ok(()),
        Err(e) => Err(format!("expected DocumentNotFound, got: {e}")),
        Ok(_) => Err("document should not be visible before commit".to_string()),
    }
}

/// After insert + abort, the document must NOT exist.
async fn insert_not_visible_after_abort<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.insert_document(&mut snap, make_document("doc-1"))
        .await
        .map_err(|e| e.to_string())?;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;

    match s.get_document("doc-1").await {
        Err(ref e) if matches!(e, StorageError::DocumentNotFound { .. }) => Ok(()),
        Err(e) => Err(format!("expected DocumentNotFound, got: {e}")),
        Ok(_) => Err("document should not be visible after abort".to_string()),
    }
}

/// After insert + commit, the document must be visible.
async fn insert_visible_after_commit<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_document(&s, "doc-1").await?;
    s.get_document("doc-1").await.map_err(|e| e.to_string())?;
    Ok(())
}

/// Transition rows staged in an open snapshot must not appear in
/// list_transitions until commit.
async fn transition_rows_not_visible_before_commit<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.insert_document(&mut snap, make_document("doc-1"))
        .await
        .map_err(|e| e.to_string())?;
    s.insert_transition(&mut snap, make_creation_transition("t-1", "doc-1"))
        .await
        .map_err(|e| e.to_string())?;

    let rows = s.list_transitions("doc-1").await.map_err(|e| e.to_string())?;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;

    if !rows.is_empty() {
        return Err(format!(
            "expected no visible transition rows before commit, got {}",
            rows.len()
        ));
    }
    Ok(())
}

/// Inside its own snapshot, a staged insert must be readable via
/// get_document_for_update.
async fn staged_write_visible_inside_own_snapshot<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.insert_document(&mut snap, make_document("doc-1"))
        .await
        .map_err(|e| e.to_string())?;

    let result = s.get_document_for_update(&mut snap, "doc-1").await;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;

    match result {
        Ok(rec) if rec.id == "doc-1" => Ok(()),
        Ok(rec) => Err(format!("expected doc-1, got {}", rec.id)),
        Err(e) => Err(format!("staged insert not visible in own snapshot: {e}")),
    }
}
