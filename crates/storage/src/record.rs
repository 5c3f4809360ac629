use serde::{Deserialize, Serialize};

use boletin_core::{DocumentType, LegalStatus, WorkflowState};

/// A document row as stored in the backend: the scalar fields plus the
/// `state` column and an OCC version counter. Transition history lives in
/// its own table ([`TransitionRow`]) keyed by document id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub doc_type: DocumentType,
    pub special_number: String,
    /// ISO 8601 date.
    pub publication_date: String,
    pub reference: String,
    pub content: String,
    pub keywords: Vec<String>,
    pub file_url: Option<String>,
    pub state: WorkflowState,
    pub legal_status: LegalStatus,
    /// Version counter for optimistic concurrency. Starts at 0.
    pub version: i64,
    /// RFC 3339 timestamp.
    pub created_at: String,
    /// RFC 3339 timestamp.
    pub updated_at: String,
}

/// One row of the transition audit table.
///
/// `from_state` is NULL only for a document's creation row; rows are
/// ordered by timestamp ascending and never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRow {
    pub id: String,
    pub document_id: String,
    pub from_state: Option<WorkflowState>,
    pub to_state: WorkflowState,
    /// RFC 3339 timestamp.
    pub timestamp: String,
    pub user_id: String,
    pub user_role: String,
    pub notes: Option<String>,
}

/// Full replacement of a document's descriptive fields. Workflow state and
/// the version counter are deliberately absent: state changes only go
/// through the transition path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentUpdate {
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub special_number: String,
    pub publication_date: String,
    pub reference: String,
    pub content: String,
    pub keywords: Vec<String>,
    pub file_url: Option<String>,
    pub legal_status: LegalStatus,
}
