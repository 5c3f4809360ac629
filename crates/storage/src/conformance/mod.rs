//! Conformance test suite for `DocumentStorage` implementations.
//!
//! A backend-agnostic suite that any `DocumentStorage` implementation can
//! run to verify correctness. The suite covers:
//!
//! - **Initialization**: document creation, duplicate detection
//! - **Snapshot isolation**: uncommitted writes invisible, committed writes visible
//! - **Atomic commit**: the state update and its audit row land together or not at all
//! - **Version validation / OCC**: optimistic concurrency conflict detection
//! - **History**: transition rows append-only, ordered, creation row has no from_state
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory function that
//! creates a fresh, empty storage instance for each test:
//!
//! ```ignore
//! use boletin_storage::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn postgres_conformance() {
//!     let report = run_conformance_suite(|| async {
//!         create_test_postgres_storage().await
//!     }).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod commit;
mod history;
mod init;
mod snapshot;
mod version;

use std::fmt;
use std::future::Future;

use boletin_core::{DocumentType, LegalStatus, WorkflowState};

use crate::record::{DocumentRecord, TransitionRow};
use crate::DocumentStorage;

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "init", "snapshot", "commit").
    pub category: String,
    /// Test name (e.g. "insert_creates_document_at_version_0").
    pub name: String,
    /// Whether the test passed.
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn pass(category: &str, name: &str) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: true,
            message: None,
        }
    }

    fn fail(category: &str, name: &str, msg: String) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: false,
            message: Some(msg),
        }
    }

    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self::pass(category, name),
            Err(msg) => Self::fail(category, name, msg),
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full conformance suite against a storage backend.
///
/// The `factory` function is called once per test to create a fresh, empty
/// storage instance, ensuring test isolation.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: DocumentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.extend(init::run_init_tests(&factory).await);
    results.extend(snapshot::run_snapshot_tests(&factory).await);
    results.extend(commit::run_commit_tests(&factory).await);
    results.extend(version::run_version_tests(&factory).await);
    results.extend(history::run_history_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

// ── Helpers: record constructors with sensible defaults ──────────────────────

fn make_document(id: &str) -> DocumentRecord {
    DocumentRecord {
        id: id.to_string(),
        doc_type: DocumentType::Decree,
        special_number: format!("{id}/2026"),
        publication_date: "2026-01-15".to_string(),
        reference: format!("EXP-2026-{id}"),
        content: "test content".to_string(),
        keywords: vec!["test".to_string()],
        file_url: None,
        state: WorkflowState::Draft,
        legal_status: LegalStatus::SinEstado,
        version: 0,
        created_at: "2026-01-01T00:00:00Z".to_string(),
        updated_at: "2026-01-01T00:00:00Z".to_string(),
    }
}

fn make_creation_transition(id: &str, document_id: &str) -> TransitionRow {
    TransitionRow {
        id: id.to_string(),
        document_id: document_id.to_string(),
        from_state: None,
        to_state: WorkflowState::Draft,
        timestamp: "2026-01-01T00:00:00Z".to_string(),
        user_id: "test-user".to_string(),
        user_role: "ADMIN".to_string(),
        notes: None,
    }
}

fn make_transition(
    id: &str,
    document_id: &str,
    from_state: WorkflowState,
    to_state: WorkflowState,
    timestamp: &str,
) -> TransitionRow {
    TransitionRow {
        id: id.to_string(),
        document_id: document_id.to_string(),
        from_state: Some(from_state),
        to_state,
        timestamp: timestamp.to_string(),
        user_id: "test-user".to_string(),
        user_role: "ADMIN".to_string(),
        notes: None,
    }
}

/// Insert a document (plus its creation transition row) and commit.
async fn seed_document<S: DocumentStorage>(storage: &S, id: &str) -> Result<(), String> {
    let mut snap = storage.begin_snapshot().await.map_err(|e| e.to_string())?;
    storage
        .insert_document(&mut snap, make_document(id))
        .await
        .map_err(|e| e.to_string())?;
    storage
        .insert_transition(&mut snap, make_creation_transition(&format!("t-{id}-0"), id))
        .await
        .map_err(|e| e.to_string())?;
    storage
        .commit_snapshot(snap)
        .await
        .map_err(|e| e.to_string())
}
