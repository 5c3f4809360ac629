use std::future::Future;

use boletin_core::WorkflowState;

use super::{make_transition, seed_document, TestResult};
use crate::DocumentStorage;

pub(super) async fn run_commit_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: DocumentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "commit",
        "state_update_and_audit_row_commit_together",
        state_update_and_audit_row_commit_together(factory).await,
    ));
    results.push(TestResult::from_result(
        "commit",
        "aborted_transition_leaves_no_trace",
        aborted_transition_leaves_no_trace(factory).await,
    ));
    results.push(TestResult::from_result(
        "commit",
        "state_never_observed_without_matching_history",
        state_never_observed_without_matching_history(factory).await,
    ));

    results
}

// ── Test implementations ──────────────────────────────────────────────────────

/// A workflow transition is one snapshot: after commit, both the new state
/// and the new audit row must be visible.
async fn state_update_and_audit_row_commit_together<S, F, Fut>(factory: &F) -> Result<(), String>
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
    s.insert_transition(
        &mut snap,
        make_transition(
            "t-doc-1-1",
            "doc-1",
            WorkflowState::Draft,
            WorkflowState::Review,
            "2026-01-02T00:00:00Z",
        ),
    )
    .await
    .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let rec = s.get_document("doc-1").await.map_err(|e| e.to_string())?;
    if rec.state != WorkflowState::Review {
        return Err(format!("expected state REVIEW, got {}", rec.state));
    }
    let rows = s.list_transitions("doc-1").await.map_err(|e| e.to_string())?;
    if rows.len() != 2 {
        return Err(format!("expected 2 transition rows, got {}", rows.len()));
    }
    Ok(())
}

/// After staging a transition and aborting, neither the state change nor
/// the audit row may be visible.
async fn aborted_transition_leaves_no_trace<S, F, Fut>(factory: &F) -> Result<(), String>
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
    s.insert_transition(
        &mut snap,
        make_transition(
            "t-doc-1-1",
            "doc-1",
            WorkflowState::Draft,
            WorkflowState::Review,
            "2026-01-02T00:00:00Z",
        ),
    )
    .await
    .map_err(|e| e.to_string())?;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;

    let rec = s.get_document("doc-1").await.map_err(|e| e.to_string())?;
    if rec.state != WorkflowState::Draft {
        return Err(format!("expected state DRAFT after abort, got {}", rec.state));
    }
    if rec.version != 0 {
        return Err(format!("expected version 0 after abort, got {}", rec.version));
    }
    let rows = s.list_transitions("doc-1").await.map_err(|e| e.to_string())?;
    if rows.len() != 1 {
        return Err(format!(
            "expected only the creation row after abort, got {} rows",
            rows.len()
        ));
    }
    Ok(())
}

/// While the transition snapshot is open, readers must still see the old
/// state AND the old history — never a half-applied mix.
async fn state_never_observed_without_matching_history<S, F, Fut>(factory: &F) -> Result<(), String>
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

    // Mid-snapshot: state update staged, audit row not yet inserted.
    let rec = s.get_document("doc-1").await.map_err(|e| e.to_string())?;
    let rows = s.list_transitions("doc-1").await.map_err(|e| e.to_string())?;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;

    if rec.state != WorkflowState::Draft {
        return Err(format!(
            "reader observed uncommitted state {}, expected DRAFT",
            rec.state
        ));
    }
    if rec.state != rows.last().map(|r| r.to_state).unwrap_or(rec.state) {
        return Err("observed state does not match last visible history row".to_string());
    }
    Ok(())
}
