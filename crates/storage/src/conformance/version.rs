use std::future::Future;

use boletin_core::WorkflowState;

use super::{seed_document, TestResult};
use crate::{DocumentStorage, StorageError};

pub(super) async fn run_version_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: DocumentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "version",
        "version_starts_at_zero",
        version_starts_at_zero(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "update_increments_version",
        update_increments_version(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "update_with_wrong_version_returns_conflict",
        update_with_wrong_version_returns_conflict(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "stale_version_after_intervening_commit",
        stale_version_after_intervening_commit(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "conflict_does_not_change_state",
        conflict_does_not_change_state(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "conflict_has_correct_fields",
        conflict_has_correct_fields(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "two_snapshots_race_one_wins",
        two_snapshots_race_one_wins(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "field_update_does_not_bump_version",
        field_update_does_not_bump_version(factory).await,
    ));

    results
}

// ── Test implementations ──────────────────────────────────────────────────────

/// After seed, the document version must be 0.
async fn version_starts_at_zero<S, F, Fut>(factory: &F) -> Result<(), String>
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

/// A state update from v0 must return and persist version 1.
async fn update_increments_version<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_document(&s, "doc-1").await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let new_version = s
        .update_document_state(
            &mut snap,
            "doc-1",
            0,
            WorkflowState::Review,
            "2026-01-02T00:00:00Z",
        )
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    if new_version != 1 {
        return Err(format!("update returned version {new_version}, expected 1"));
    }
    let rec = s.get_document("doc-1").await.map_err(|e| e.to_string())?;
    if rec.version != 1 {
        return Err(format!("stored version {}, expected 1", rec.version));
    }
    Ok(())
}

/// Update with a wildly wrong version must return ConcurrentConflict.
async fn update_with_wrong_version_returns_conflict<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_document(&s, "doc-1").await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let result = s
        .update_document_state(
            &mut snap,
            "doc-1",
            999,
            WorkflowState::Review,
            "2026-01-02T00:00:00Z",
        )
        .await;
    let _ = s.abort_snapshot(snap).await;

    match result {
        Err(StorageError::ConcurrentConflict { .. }) => Ok(()),
        other => Err(format!("expected ConcurrentConflict, got {other:?}")),
    }
}

/// After a successful update to v1, a stale update with v0 must conflict.
async fn stale_version_after_intervening_commit<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_document(&s, "doc-1").await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.update_document_state(
        &mut snap,
        "doc-1",
        0,
        WorkflowState::Review,
        "2026-01-02T00:00:00Z",
    )
    .await
    .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let result = s
        .update_document_state(
            &mut snap,
            "doc-1",
            0,
            WorkflowState::Review,
            "2026-01-03T00:00:00Z",
        )
        .await;
    let _ = s.abort_snapshot(snap).await;

    match result {
        Err(StorageError::ConcurrentConflict { .. }) => Ok(()),
        other => Err(format!("expected ConcurrentConflict, got {other:?}")),
    }
}

/// After a conflicting update, state and version must be unchanged.
async fn conflict_does_not_change_state<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_document(&s, "doc-1").await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let result = s
        .update_document_state(
            &mut snap,
            "doc-1",
            999,
            WorkflowState::Review,
            "2026-01-02T00:00:00Z",
        )
        .await;
    let _ = s.abort_snapshot(snap).await;

    if !matches!(result, Err(StorageError::ConcurrentConflict { .. })) {
        return Err(format!("expected ConcurrentConflict, got {result:?}"));
    }

    let rec = s.get_document("doc-1").await.map_err(|e| e.to_string())?;
    if rec.state != WorkflowState::Draft || rec.version != 0 {
        return Err(format!(
            "conflict mutated the row: state {}, version {}",
            rec.state, rec.version
        ));
    }
    Ok(())
}

/// ConcurrentConflict must carry the document id and the expected version.
async fn conflict_has_correct_fields<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_document(&s, "doc-7").await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let result = s
        .update_document_state(
            &mut snap,
            "doc-7",
            42,
            WorkflowState::Review,
            "2026-01-02T00:00:00Z",
        )
        .await;
    let _ = s.abort_snapshot(snap).await;

    match result {
        Err(StorageError::ConcurrentConflict {
            document_id,
            expected_version,
        }) => {
            if document_id != "doc-7" {
                return Err(format!("expected document_id \"doc-7\", got \"{document_id}\""));
            }
            if expected_version != 42 {
                return Err(format!("expected expected_version 42, got {expected_version}"));
            }
            Ok(())
        }
        other => Err(format!("expected ConcurrentConflict, got {other:?}")),
    }
}

/// Two snapshots both read v0; the first commits, the second's stale update
/// must conflict and the winner's state must stand.
async fn two_snapshots_race_one_wins<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_document(&s, "doc-1").await?;

    let mut snap1 = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let rec1 = s
        .get_document_for_update(&mut snap1, "doc-1")
        .await
        .map_err(|e| e.to_string())?;

    let mut snap2 = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let rec2 = s
        .get_document_for_update(&mut snap2, "doc-1")
        .await
        .map_err(|e| e.to_string())?;

    if rec1.version != 0 || rec2.version != 0 {
        let _ = s.abort_snapshot(snap1).await;
        let _ = s.abort_snapshot(snap2).await;
        return Err("both snapshots should read version 0".to_string());
    }

    // Snap1 wins the race.
    s.update_document_state(
        &mut snap1,
        "doc-1",
        rec1.version,
        WorkflowState::Review,
        "2026-01-02T00:00:00Z",
    )
    .await
    .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap1).await.map_err(|e| e.to_string())?;

    // Snap2's stale update must conflict.
    let result = s
        .update_document_state(
            &mut snap2,
            "doc-1",
            rec2.version,
            WorkflowState::Review,
            "2026-01-02T00:00:01Z",
        )
        .await;
    let _ = s.abort_snapshot(snap2).await;

    if !matches!(result, Err(StorageError::ConcurrentConflict { .. })) {
        return Err(format!("expected ConcurrentConflict for the loser, got {result:?}"));
    }

    let rec = s.get_document("doc-1").await.map_err(|e| e.to_string())?;
    if rec.state != WorkflowState::Review || rec.version != 1 {
        return Err(format!(
            "expected winner's REVIEW at v1, got {} at v{}",
            rec.state, rec.version
        ));
    }
    Ok(())
}

/// update_document_fields must not consume the OCC version counter.
async fn field_update_does_not_bump_version<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_document(&s, "doc-1").await?;

    let rec = s.get_document("doc-1").await.map_err(|e| e.to_string())?;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.update_document_fields(
        &mut snap,
        "doc-1",
        crate::DocumentUpdate {
            doc_type: rec.doc_type,
            special_number: rec.special_number.clone(),
            publication_date: rec.publication_date.clone(),
            reference: "EXP-2026-corrected".to_string(),
            content: rec.content.clone(),
            keywords: rec.keywords.clone(),
            file_url: rec.file_url.clone(),
            legal_status: rec.legal_status,
        },
        "2026-01-02T00:00:00Z",
    )
    .await
    .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let rec = s.get_document("doc-1").await.map_err(|e| e.to_string())?;
    if rec.version != 0 {
        return Err(format!(
            "field update changed version to {}, expected 0",
            rec.version
        ));
    }
    if rec.reference != "EXP-2026-corrected" {
        return Err("field update did not apply".to_string());
    }
    Ok(())
}
