use async_trait::async_trait;

use boletin_core::{DocumentFilter, WorkflowState};

use crate::error::StorageError;
use crate::record::{DocumentRecord, DocumentUpdate, TransitionRow};

/// The storage trait for boletin persistence backends.
///
/// A `DocumentStorage` implementation provides durable, transactional
/// storage for document rows and their transition audit rows.
///
/// ## Snapshot Semantics
///
/// All mutating operations take `&mut Self::Snapshot`, a type representing an
/// in-progress transaction. The lifecycle is:
///
/// 1. `begin_snapshot()` — start a transaction, returns a `Snapshot`
/// 2. Call mutating methods with `&mut snapshot`
/// 3. `commit_snapshot(snapshot)` — commit and consume the transaction
///    OR `abort_snapshot(snapshot)` — roll back and consume the transaction
///
/// If a `Snapshot` is dropped without committing, the underlying transaction
/// MUST be rolled back (drop semantics on the underlying DB transaction).
///
/// The combined state update + transition append of a workflow transition
/// happens inside one snapshot; a reader must never observe the state
/// column updated without the matching audit row, or vice versa.
///
/// ## OCC Conflict Detection
///
/// `update_document_state` performs an optimistic concurrency check:
/// `UPDATE WHERE version = expected_version`. If zero rows are affected,
/// the method returns `Err(StorageError::ConcurrentConflict { ... })`.
/// When two transitions race on one document, at most one commits; the
/// other fails the version check.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` to be used in axum
/// application state and across async task boundaries.
#[async_trait]
pub trait DocumentStorage: Send + Sync + 'static {
    /// The snapshot (transaction) type used by this storage backend.
    ///
    /// Must be `Send` to allow passing across async task boundaries.
    type Snapshot: Send;

    // ── Snapshot lifecycle ────────────────────────────────────────────────────

    /// Begin a new snapshot (transaction).
    async fn begin_snapshot(&self) -> Result<Self::Snapshot, StorageError>;

    /// Commit a snapshot, making all mutations durable.
    async fn commit_snapshot(&self, snapshot: Self::Snapshot) -> Result<(), StorageError>;

    /// Abort (roll back) a snapshot, discarding all mutations.
    async fn abort_snapshot(&self, snapshot: Self::Snapshot) -> Result<(), StorageError>;

    // ── Document mutations (within snapshot) ─────────────────────────────────

    /// Insert a new document row at version 0.
    ///
    /// Returns `Err(StorageError::AlreadyExists)` if a row with this id
    /// already exists. The caller inserts the creation transition row in
    /// the same snapshot.
    async fn insert_document(
        &self,
        snapshot: &mut Self::Snapshot,
        record: DocumentRecord,
    ) -> Result<(), StorageError>;

    /// Read a document row for a subsequent state update.
    ///
    /// Returns `Err(StorageError::DocumentNotFound)` if the document does
    /// not exist.
    async fn get_document_for_update(
        &self,
        snapshot: &mut Self::Snapshot,
        document_id: &str,
    ) -> Result<DocumentRecord, StorageError>;

    /// Apply a version-validated UPDATE to a document's state column (OCC).
    ///
    /// The UPDATE is conditional on `version = expected_version`.
    /// If zero rows are affected, returns `Err(StorageError::ConcurrentConflict)`.
    ///
    /// Returns the new version number on success.
    async fn update_document_state(
        &self,
        snapshot: &mut Self::Snapshot,
        document_id: &str,
        expected_version: i64,
        new_state: WorkflowState,
        updated_at: &str,
    ) -> Result<i64, StorageError>;

    /// Replace a document's descriptive fields. Never touches the state
    /// column or the version counter.
    async fn update_document_fields(
        &self,
        snapshot: &mut Self::Snapshot,
        document_id: &str,
        fields: DocumentUpdate,
        updated_at: &str,
    ) -> Result<(), StorageError>;

    /// Insert a transition audit row.
    ///
    /// Must be inserted in the SAME snapshot as the `update_document_state`
    /// call it records: no state change without its audit row.
    async fn insert_transition(
        &self,
        snapshot: &mut Self::Snapshot,
        row: TransitionRow,
    ) -> Result<(), StorageError>;

    // ── Query operations (outside snapshot, against pool/connection) ──────────

    /// Read a document row without locking.
    ///
    /// Returns `Err(StorageError::DocumentNotFound)` if the document does
    /// not exist.
    async fn get_document(&self, document_id: &str) -> Result<DocumentRecord, StorageError>;

    /// List document rows matching the filter, ordered by publication_date
    /// descending.
    async fn list_documents(
        &self,
        filter: &DocumentFilter,
    ) -> Result<Vec<DocumentRecord>, StorageError>;

    /// List a document's transition rows, ordered by timestamp ascending.
    ///
    /// Returns an empty list for an unknown document id; existence is the
    /// caller's concern.
    async fn list_transitions(&self, document_id: &str) -> Result<Vec<TransitionRow>, StorageError>;
}
