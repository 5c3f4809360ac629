//! In-memory reference backend.
//!
//! `MemoryStorage` is the default backend for the server and for tests.
//! Writes are staged in the snapshot and applied to the shared maps only on
//! commit; commit re-validates OCC versions against the committed state, so
//! all-or-nothing semantics hold even when two snapshots race.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use boletin_core::{DocumentFilter, WorkflowState};

use crate::error::StorageError;
use crate::record::{DocumentRecord, DocumentUpdate, TransitionRow};
use crate::traits::DocumentStorage;

#[derive(Default)]
struct Inner {
    documents: BTreeMap<String, DocumentRecord>,
    transitions: Vec<TransitionRow>,
}

/// A staged document write, validated again at commit time.
enum StagedDoc {
    /// New row; commit fails with `AlreadyExists` if the id appeared meanwhile.
    Insert(DocumentRecord),
    /// Modified row; commit fails with `ConcurrentConflict` if the committed
    /// version no longer equals `base_version`.
    Update {
        base_version: i64,
        record: DocumentRecord,
    },
}

/// Staged writes for one in-progress transaction. Dropping the snapshot
/// without committing discards everything.
pub struct MemorySnapshot {
    staged_docs: BTreeMap<String, StagedDoc>,
    staged_transitions: Vec<TransitionRow>,
}

/// In-memory implementation of [`DocumentStorage`].
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current view of a document inside a snapshot: staged write if any,
    /// committed row otherwise.
    fn view(
        &self,
        snapshot: &MemorySnapshot,
        document_id: &str,
    ) -> Result<DocumentRecord, StorageError> {
        if let Some(staged) = snapshot.staged_docs.get(document_id) {
            let record = match staged {
                StagedDoc::Insert(r) => r,
                StagedDoc::Update { record, .. } => record,
            };
            return Ok(record.clone());
        }
        let inner = self.lock();
        inner
            .documents
            .get(document_id)
            .cloned()
            .ok_or_else(|| StorageError::DocumentNotFound {
                document_id: document_id.to_string(),
            })
    }

    /// Stage a modified record, preserving the base version of the first
    /// staged write for this id.
    fn stage(&self, snapshot: &mut MemorySnapshot, record: DocumentRecord, read_version: i64) {
        let id = record.id.clone();
        let staged = match snapshot.staged_docs.remove(&id) {
            Some(StagedDoc::Insert(_)) => StagedDoc::Insert(record),
            Some(StagedDoc::Update { base_version, .. }) => StagedDoc::Update {
                base_version,
                record,
            },
            None => StagedDoc::Update {
                base_version: read_version,
                record,
            },
        };
        snapshot.staged_docs.insert(id, staged);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned mutex means a panic mid-write; propagating the panic
        // is the only sound option for an in-memory store.
        self.inner.lock().expect("memory storage mutex poisoned")
    }
}

#[async_trait]
impl DocumentStorage for MemoryStorage {
    type Snapshot = MemorySnapshot;

    async fn begin_snapshot(&self) -> Result<MemorySnapshot, StorageError> {
        Ok(MemorySnapshot {
            staged_docs: BTreeMap::new(),
            staged_transitions: Vec::new(),
        })
    }

    async fn commit_snapshot(&self, snapshot: MemorySnapshot) -> Result<(), StorageError> {
        let mut inner = self.lock();

        // Validate everything before applying anything.
        for (id, staged) in &snapshot.staged_docs {
            match staged {
                StagedDoc::Insert(_) => {
                    if inner.documents.contains_key(id) {
                        return Err(StorageError::AlreadyExists {
                            document_id: id.clone(),
                        });
                    }
                }
                StagedDoc::Update { base_version, .. } => {
                    let current = inner.documents.get(id).ok_or_else(|| {
                        StorageError::DocumentNotFound {
                            document_id: id.clone(),
                        }
                    })?;
                    if current.version != *base_version {
                        return Err(StorageError::ConcurrentConflict {
                            document_id: id.clone(),
                            expected_version: *base_version,
                        });
                    }
                }
            }
        }

        for (id, staged) in snapshot.staged_docs {
            let record = match staged {
                StagedDoc::Insert(r) => r,
                StagedDoc::Update { record, .. } => record,
            };
            inner.documents.insert(id, record);
        }
        inner.transitions.extend(snapshot.staged_transitions);
        Ok(())
    }

    async fn abort_snapshot(&self, _snapshot: MemorySnapshot) -> Result<(), StorageError> {
        // Staged writes are dropped with the snapshot.
        Ok(())
    }

    async fn insert_document(
        &self,
        snapshot: &mut MemorySnapshot,
        record: DocumentRecord,
    ) -> Result<(), StorageError> {
        let exists_staged = snapshot.staged_docs.contains_key(&record.id);
        let exists_committed = self.lock().documents.contains_key(&record.id);
        if exists_staged || exists_committed {
            return Err(StorageError::AlreadyExists {
                document_id: record.id.clone(),
            });
        }
        snapshot
            .staged_docs
            .insert(record.id.clone(), StagedDoc::Insert(record));
        Ok(())
    }

    async fn get_document_for_update(
        &self,
        snapshot: &mut MemorySnapshot,
        document_id: &str,
    ) -> Result<DocumentRecord, StorageError> {
        self.view(snapshot, document_id)
    }

    async fn update_document_state(
        &self,
        snapshot: &mut MemorySnapshot,
        document_id: &str,
        expected_version: i64,
        new_state: WorkflowState,
        updated_at: &str,
    ) -> Result<i64, StorageError> {
        let mut record = self.view(snapshot, document_id)?;
        if record.version != expected_version {
            return Err(StorageError::ConcurrentConflict {
                document_id: document_id.to_string(),
                expected_version,
            });
        }
        record.state = new_state;
        record.version += 1;
        record.updated_at = updated_at.to_string();
        let new_version = record.version;
        self.stage(snapshot, record, expected_version);
        Ok(new_version)
    }

    async fn update_document_fields(
        &self,
        snapshot: &mut MemorySnapshot,
        document_id: &str,
        fields: DocumentUpdate,
        updated_at: &str,
    ) -> Result<(), StorageError> {
        let mut record = self.view(snapshot, document_id)?;
        let read_version = record.version;
        record.doc_type = fields.doc_type;
        record.special_number = fields.special_number;
        record.publication_date = fields.publication_date;
        record.reference = fields.reference;
        record.content = fields.content;
        record.keywords = fields.keywords;
        record.file_url = fields.file_url;
        record.legal_status = fields.legal_status;
        record.updated_at = updated_at.to_string();
        self.stage(snapshot, record, read_version);
        Ok(())
    }

    async fn insert_transition(
        &self,
        snapshot: &mut MemorySnapshot,
        row: TransitionRow,
    ) -> Result<(), StorageError> {
        // The parent document must be visible inside this snapshot.
        self.view(snapshot, &row.document_id)?;
        snapshot.staged_transitions.push(row);
        Ok(())
    }

    async fn get_document(&self, document_id: &str) -> Result<DocumentRecord, StorageError> {
        let inner = self.lock();
        inner
            .documents
            .get(document_id)
            .cloned()
            .ok_or_else(|| StorageError::DocumentNotFound {
                document_id: document_id.to_string(),
            })
    }

    async fn list_documents(
        &self,
        filter: &DocumentFilter,
    ) -> Result<Vec<DocumentRecord>, StorageError> {
        let inner = self.lock();
        let needle = filter.search_text.as_ref().map(|s| s.to_lowercase());
        let mut matched: Vec<DocumentRecord> = inner
            .documents
            .values()
            .filter(|d| filter.doc_type.map_or(true, |t| d.doc_type == t))
            .filter(|d| filter.state.map_or(true, |s| d.state == s))
            .filter(|d| {
                needle.as_ref().map_or(true, |n| {
                    d.reference.to_lowercase().contains(n) || d.content.to_lowercase().contains(n)
                })
            })
            .filter(|d| {
                filter
                    .date_from
                    .as_ref()
                    .map_or(true, |from| d.publication_date.as_str() >= from.as_str())
            })
            .filter(|d| {
                filter
                    .date_to
                    .as_ref()
                    .map_or(true, |to| d.publication_date.as_str() <= to.as_str())
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.publication_date.cmp(&a.publication_date));
        Ok(matched)
    }

    async fn list_transitions(&self, document_id: &str) -> Result<Vec<TransitionRow>, StorageError> {
        let inner = self.lock();
        let mut rows: Vec<TransitionRow> = inner
            .transitions
            .iter()
            .filter(|t| t.document_id == document_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conformance::run_conformance_suite;
    use boletin_core::{DocumentType, LegalStatus};

    fn record(id: &str, doc_type: DocumentType, publication_date: &str) -> DocumentRecord {
        DocumentRecord {
            id: id.to_string(),
            doc_type,
            special_number: format!("{id}/2026"),
            publication_date: publication_date.to_string(),
            reference: format!("EXP-{id}"),
            content: format!("contenido {id}"),
            keywords: vec![],
            file_url: None,
            state: WorkflowState::Draft,
            legal_status: LegalStatus::SinEstado,
            version: 0,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    async fn seed(storage: &MemoryStorage, records: Vec<DocumentRecord>) {
        let mut snap = storage.begin_snapshot().await.unwrap();
        for r in records {
            storage.insert_document(&mut snap, r).await.unwrap();
        }
        storage.commit_snapshot(snap).await.unwrap();
    }

    #[tokio::test]
    async fn memory_backend_passes_conformance_suite() {
        let report = run_conformance_suite(|| async { MemoryStorage::new() }).await;
        assert_eq!(report.failed, 0, "{report}");
    }

    #[tokio::test]
    async fn list_orders_by_publication_date_descending() {
        let storage = MemoryStorage::new();
        seed(
            &storage,
            vec![
                record("a", DocumentType::Decree, "2026-01-10"),
                record("b", DocumentType::Decree, "2026-03-05"),
                record("c", DocumentType::Decree, "2026-02-20"),
            ],
        )
        .await;

        let docs = storage
            .list_documents(&DocumentFilter::default())
            .await
            .unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "a"]);
    }

    #[tokio::test]
    async fn list_filters_by_type_and_search_text() {
        let storage = MemoryStorage::new();
        let mut tax_decree = record("a", DocumentType::Decree, "2026-01-10");
        tax_decree.content = "Ordenanza tributaria de tasas municipales".to_string();
        seed(
            &storage,
            vec![
                tax_decree,
                record("b", DocumentType::Resolution, "2026-03-05"),
                record("c", DocumentType::Decree, "2026-02-20"),
            ],
        )
        .await;

        let filter = DocumentFilter {
            doc_type: Some(DocumentType::Decree),
            search_text: Some("TASAS".to_string()),
            ..Default::default()
        };
        let docs = storage.list_documents(&filter).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "a");
    }

    #[tokio::test]
    async fn list_filters_by_date_range_inclusive() {
        let storage = MemoryStorage::new();
        seed(
            &storage,
            vec![
                record("a", DocumentType::Bid, "2026-01-10"),
                record("b", DocumentType::Bid, "2026-02-20"),
                record("c", DocumentType::Bid, "2026-03-05"),
            ],
        )
        .await;

        let filter = DocumentFilter {
            date_from: Some("2026-01-10".to_string()),
            date_to: Some("2026-02-20".to_string()),
            ..Default::default()
        };
        let docs = storage.list_documents(&filter).await.unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[tokio::test]
    async fn transition_rows_for_unknown_document_are_empty() {
        let storage = MemoryStorage::new();
        assert!(storage.list_transitions("missing").await.unwrap().is_empty());
    }
}
