use std::future::Future;

use boletin_core::WorkflowState;

use super::{make_creation_transition, make_document, seed_document, TestResult};
use crate::{DocumentStorage, StorageError};

pub(super) async fn run_init_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: DocumentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "init",
        "insert_creates_document_at_version_0",
        insert_creates_document_at_version_0(factory).await,
    ));
    results.push(TestResult::from_result(
        "init",
        "insert_sets_draft_state",
        insert_sets_draft_state(factory).await,
    ));
    results.push(TestResult::from_result(
        "init",
        "double_insert_returns_already_exists",
        double_insert_returns_already_exists(factory).await,
    ));
    results.push(TestResult::from_result(
        "init",
        "double_insert_across_snapshots",
        double_insert_across_snapshots(factory).await,
    ));
    results.push(TestResult::from_result(
        "init",
        "already_exists_error_has_correct_id",
        already_exists_error_has_correct_id(factory).await,
    ));
    results.push(TestResult::from_result(
        "init",
        "different_documents_are_independent",
        different_documents_are_independent(factory).await,
    ));
    results.push(TestResult::from_result(
        "init",
        "unknown_document_returns_not_found",
        unknown_document_returns_not_found(factory).await,
    ));

    results
}

// ── Test implementations ──────────────────────────────────────────────────────

/// After insert + commit, the document version must be 0.
async fn insert_creates_document_at_version_0<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_document(&s, "doc-1").await?;

    let rec = s.get_document("doc-1").await.map_err(|e| e.to_string())?;
    if rec.version != 0 {
        return Err(format!("expected version 0, got {}", rec.version));
    }
    Ok(())
}

/// The seeded document row carries state DRAFT.
async fn insert_sets_draft_state<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_document(&s, "doc-1").await?;

    let rec = s.get_document("doc-1").await.map_err(|e| e.to_string())?;
    if rec.state != WorkflowState::Draft {
        return Err(format!("expected state DRAFT, got {}", rec.state));
    }
    Ok(())
}

/// Inserting the same document twice in the same snapshot must return AlreadyExists.
async fn double_insert_returns_already_exists<S, F, Fut>(factory: &F) -> Result<(), String>
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

    let result = s.insert_document(&mut snap, make_document("doc-1")).await;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;

    match result {
        Err(ref e) if matches!(e, StorageError::AlreadyExists { .. }) => Ok(()),
        Err(e) => Err(format!("expected AlreadyExists, got: {e}")),
        Ok(()) => Err("expected AlreadyExists error, but got Ok".to_string()),
    }
}

/// Inserting the same document in a second snapshot after committing the
/// first must return AlreadyExists.
async fn double_insert_across_snapshots<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_document(&s, "doc-1").await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let result = s.insert_document(&mut snap, make_document("doc-1")).await;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;

    match result {
        Err(ref e) if matches!(e, StorageError::AlreadyExists { .. }) => Ok(()),
        Err(e) => Err(format!("expected AlreadyExists, got: {e}")),
        Ok(()) => Err("expected AlreadyExists error, but got Ok".to_string()),
    }
}

/// The AlreadyExists error must carry the offending document id.
async fn already_exists_error_has_correct_id<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_document(&s, "doc-42").await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let result = s.insert_document(&mut snap, make_document("doc-42")).await;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;

    match result {
        Err(StorageError::AlreadyExists { document_id }) => {
            if document_id != "doc-42" {
                return Err(format!("expected document_id \"doc-42\", got \"{document_id}\""));
            }
            Ok(())
        }
        Err(e) => Err(format!("expected AlreadyExists, got: {e}")),
        Ok(()) => Err("expected AlreadyExists error, but got Ok".to_string()),
    }
}

/// Two documents inserted in one snapshot must both be readable after commit.
async fn different_documents_are_independent<S, F, Fut>(factory: &F) -> Result<(), String>
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
    s.insert_document(&mut snap, make_document("doc-2"))
        .await
        .map_err(|e| e.to_string())?;
    s.insert_transition(&mut snap, make_creation_transition("t-1", "doc-1"))
        .await
        .map_err(|e| e.to_string())?;
    s.insert_transition(&mut snap, make_creation_transition("t-2", "doc-2"))
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let rec1 = s.get_document("doc-1").await.map_err(|e| e.to_string())?;
    let rec2 = s.get_document("doc-2").await.map_err(|e| e.to_string())?;
    if rec1.id != "doc-1" || rec2.id != "doc-2" {
        return Err("document ids do not match expected values".to_string());
    }
    Ok(())
}

/// get_document on an id that was never inserted must return DocumentNotFound.
async fn unknown_document_returns_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.get_document("missing").await {
        Err(ref e) if matches!(e, StorageError::DocumentNotFound { .. }) => Ok(()),
        Err(e) => Err(format!("expected DocumentNotFound, got: {e}")),
        Ok(_) => Err("expected DocumentNotFound, but got a record".to_string()),
    }
}
