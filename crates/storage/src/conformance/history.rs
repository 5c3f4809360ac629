use std::future::Future;

use boletin_core::WorkflowState;

use super::{make_transition, seed_document, TestResult};
use crate::DocumentStorage;

pub(super) async fn run_history_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: DocumentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "history",
        "creation_row_has_null_from_state",
        creation_row_has_null_from_state(factory).await,
    ));
    results.push(TestResult::from_result(
        "history",
        "rows_are_ordered_by_timestamp_ascending",
        rows_are_ordered_by_timestamp_ascending(factory).await,
    ));
    results.push(TestResult::from_result(
        "history",
        "rows_are_chained",
        rows_are_chained(factory).await,
    ));
    results.push(TestResult::from_result(
        "history",
        "rows_are_scoped_to_their_document",
        rows_are_scoped_to_their_document(factory).await,
    ));

    results
}

/// Walk a document through DRAFT -> REVIEW -> APPROVED, committing one
/// snapshot per step.
async fn advance_twice<S: DocumentStorage>(s: &S, id: &str) -> Result<(), String> {
    let steps = [
        (0, WorkflowState::Draft, WorkflowState::Review, "2026-01-02T00:00:00Z"),
        (1, WorkflowState::Review, WorkflowState::Approved, "2026-01-03T00:00:00Z"),
    ];
    for (version, from, to, ts) in steps {
        let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
        s.update_document_state(&mut snap, id, version, to, ts)
            .await
            .map_err(|e| e.to_string())?;
        s.insert_transition(
            &mut snap,
            make_transition(&format!("t-{id}-{}", version + 1), id, from, to, ts),
        )
        .await
        .map_err(|e| e.to_string())?;
        s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;
    }
    Ok(())
}

// ── Test implementations ──────────────────────────────────────────────────────

/// The first row for any document has from_state NULL — that is the
/// creation signal.
async fn creation_row_has_null_from_state<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_document(&s, "doc-1").await?;

    let rows = s.list_transitions("doc-1").await.map_err(|e| e.to_string())?;
    let first = rows.first().ok_or("expected at least the creation row")?;
    if first.from_state.is_some() {
        return Err(format!(
            "creation row must have from_state NULL, got {:?}",
            first.from_state
        ));
    }
    if first.to_state != WorkflowState::Draft {
        return Err(format!("creation row to_state {}, expected DRAFT", first.to_state));
    }
    Ok(())
}

/// list_transitions returns rows ordered by timestamp ascending.
async fn rows_are_ordered_by_timestamp_ascending<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_document(&s, "doc-1").await?;
    advance_twice(&s, "doc-1").await?;

    let rows = s.list_transitions("doc-1").await.map_err(|e| e.to_string())?;
    if rows.len() != 3 {
        return Err(format!("expected 3 rows, got {}", rows.len()));
    }
    for pair in rows.windows(2) {
        if pair[0].timestamp > pair[1].timestamp {
            return Err(format!(
                "rows out of order: {} before {}",
                pair[0].timestamp, pair[1].timestamp
            ));
        }
    }
    Ok(())
}

/// Each row's to_state equals the next row's from_state.
async fn rows_are_chained<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_document(&s, "doc-1").await?;
    advance_twice(&s, "doc-1").await?;

    let rows = s.list_transitions("doc-1").await.map_err(|e| e.to_string())?;
    for pair in rows.windows(2) {
        if Some(pair[0].to_state) != pair[1].from_state {
            return Err(format!(
                "broken chain: row to_state {} followed by from_state {:?}",
                pair[0].to_state, pair[1].from_state
            ));
        }
    }
    Ok(())
}

/// Transitions of one document never leak into another's history.
async fn rows_are_scoped_to_their_document<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_document(&s, "doc-1").await?;
    seed_document(&s, "doc-2").await?;
    advance_twice(&s, "doc-1").await?;

    let rows1 = s.list_transitions("doc-1").await.map_err(|e| e.to_string())?;
    let rows2 = s.list_transitions("doc-2").await.map_err(|e| e.to_string())?;
    if rows1.len() != 3 {
        return Err(format!("doc-1 expected 3 rows, got {}", rows1.len()));
    }
    if rows2.len() != 1 {
        return Err(format!("doc-2 expected 1 row, got {}", rows2.len()));
    }
    if rows2[0].document_id != "doc-2" {
        return Err("doc-2 history contains a foreign row".to_string());
    }
    Ok(())
}
