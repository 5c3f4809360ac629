//! Document assembly: the single mapping between storage rows and the
//! domain `Document`.
//!
//! Every read path goes through [`assemble_document`]; there is exactly one
//! canonical external representation and no tolerance for legacy field
//! variants.

use boletin_core::{Document, TransitionRecord};
use boletin_storage::{DocumentRecord, TransitionRow};

/// Build a `Document` from its row and its transition rows (already
/// ordered by timestamp ascending, as `list_transitions` guarantees).
pub fn assemble_document(record: DocumentRecord, rows: Vec<TransitionRow>) -> Document {
    Document {
        id: record.id,
        doc_type: record.doc_type,
        special_number: record.special_number,
        publication_date: record.publication_date,
        reference: record.reference,
        content: record.content,
        keywords: record.keywords,
        file_url: record.file_url,
        state: record.state,
        legal_status: record.legal_status,
        history: rows
            .into_iter()
            .map(|row| TransitionRecord {
                from_state: row.from_state,
                to_state: row.to_state,
                timestamp: row.timestamp,
                user_id: row.user_id,
                user_role: row.user_role,
                notes: row.notes,
            })
            .collect(),
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

/// Project a `Document` onto its storage row. Version starts at 0; history
/// is stored separately.
pub fn record_from_document(doc: &Document) -> DocumentRecord {
    DocumentRecord {
        id: doc.id.clone(),
        doc_type: doc.doc_type,
        special_number: doc.special_number.clone(),
        publication_date: doc.publication_date.clone(),
        reference: doc.reference.clone(),
        content: doc.content.clone(),
        keywords: doc.keywords.clone(),
        file_url: doc.file_url.clone(),
        state: doc.state,
        legal_status: doc.legal_status,
        version: 0,
        created_at: doc.created_at.clone(),
        updated_at: doc.updated_at.clone(),
    }
}

/// Project a domain transition record onto an audit row.
pub fn row_from_transition(
    row_id: impl Into<String>,
    document_id: &str,
    record: &TransitionRecord,
) -> TransitionRow {
    TransitionRow {
        id: row_id.into(),
        document_id: document_id.to_string(),
        from_state: record.from_state,
        to_state: record.to_state,
        timestamp: record.timestamp.clone(),
        user_id: record.user_id.clone(),
        user_role: record.user_role.clone(),
        notes: record.notes.clone(),
    }
}
