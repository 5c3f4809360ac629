//! Domain types: documents, workflow states, transition records.

use serde::{Deserialize, Serialize};

/// Classification of a published document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    Decree,
    Resolution,
    Ordinance,
    TribunalResolution,
    Bid,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Decree => "DECREE",
            DocumentType::Resolution => "RESOLUTION",
            DocumentType::Ordinance => "ORDINANCE",
            DocumentType::TribunalResolution => "TRIBUNAL_RESOLUTION",
            DocumentType::Bid => "BID",
        }
    }
}

impl std::str::FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DECREE" => Ok(DocumentType::Decree),
            "RESOLUTION" => Ok(DocumentType::Resolution),
            "ORDINANCE" => Ok(DocumentType::Ordinance),
            "TRIBUNAL_RESOLUTION" => Ok(DocumentType::TribunalResolution),
            "BID" => Ok(DocumentType::Bid),
            other => Err(format!("unknown document type: {other}")),
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow state of a document.
///
/// The full lifecycle is DRAFT -> REVIEW -> APPROVED -> PUBLISHED -> ARCHIVED;
/// which moves are legal is defined by [`allowed_transitions`](crate::workflow::allowed_transitions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowState {
    Draft,
    Review,
    Approved,
    Published,
    Archived,
}

impl WorkflowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::Draft => "DRAFT",
            WorkflowState::Review => "REVIEW",
            WorkflowState::Approved => "APPROVED",
            WorkflowState::Published => "PUBLISHED",
            WorkflowState::Archived => "ARCHIVED",
        }
    }

    /// All five states, in lifecycle order.
    pub const ALL: [WorkflowState; 5] = [
        WorkflowState::Draft,
        WorkflowState::Review,
        WorkflowState::Approved,
        WorkflowState::Published,
        WorkflowState::Archived,
    ];
}

impl std::str::FromStr for WorkflowState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(WorkflowState::Draft),
            "REVIEW" => Ok(WorkflowState::Review),
            "APPROVED" => Ok(WorkflowState::Approved),
            "PUBLISHED" => Ok(WorkflowState::Published),
            "ARCHIVED" => Ok(WorkflowState::Archived),
            other => Err(format!("unknown workflow state: {other}")),
        }
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Legal effect of a published document, orthogonal to workflow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LegalStatus {
    /// In force.
    Vigente,
    /// Partially in force.
    Parcial,
    /// No legal-status tag set.
    #[default]
    SinEstado,
}

/// The user performing a transition: identifier plus role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: String,
    pub user_role: String,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, user_role: impl Into<String>) -> Self {
        Actor {
            user_id: user_id.into(),
            user_role: user_role.into(),
        }
    }
}

/// Immutable audit entry for one state change.
///
/// `from_state` is `None` only for the synthetic creation record; that is
/// the signal distinguishing "created" from a true transition when
/// rendering history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from_state: Option<WorkflowState>,
    pub to_state: WorkflowState,
    /// RFC 3339 timestamp.
    pub timestamp: String,
    pub user_id: String,
    pub user_role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A regulation or bulletin record.
///
/// Invariant: `state` always equals the `to_state` of the last entry in
/// `history`, and `history` is append-only and chronological.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub special_number: String,
    /// ISO 8601 date of official publication.
    pub publication_date: String,
    pub reference: String,
    pub content: String,
    pub keywords: Vec<String>,
    /// URL of the externally stored signed PDF, if one is attached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    pub state: WorkflowState,
    pub legal_status: LegalStatus,
    pub history: Vec<TransitionRecord>,
    pub created_at: String,
    pub updated_at: String,
}

/// Payload for creating a document. State is not a field here: every
/// document starts in DRAFT.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentDraft {
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub special_number: String,
    pub publication_date: String,
    pub reference: String,
    pub content: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub legal_status: LegalStatus,
}

/// Filter for listing documents. All fields are conjunctive; `None` means
/// no constraint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentFilter {
    pub doc_type: Option<DocumentType>,
    pub state: Option<WorkflowState>,
    /// Case-insensitive substring match over reference and content.
    pub search_text: Option<String>,
    /// Inclusive lower bound on publication_date.
    pub date_from: Option<String>,
    /// Inclusive upper bound on publication_date.
    pub date_to: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_state_wire_format_is_screaming_snake() {
        let json = serde_json::to_string(&WorkflowState::Published).unwrap();
        assert_eq!(json, "\"PUBLISHED\"");
        let back: WorkflowState = serde_json::from_str("\"ARCHIVED\"").unwrap();
        assert_eq!(back, WorkflowState::Archived);
    }

    #[test]
    fn document_type_tribunal_resolution_round_trips() {
        let json = serde_json::to_string(&DocumentType::TribunalResolution).unwrap();
        assert_eq!(json, "\"TRIBUNAL_RESOLUTION\"");
        assert_eq!(
            "TRIBUNAL_RESOLUTION".parse::<DocumentType>().unwrap(),
            DocumentType::TribunalResolution
        );
    }

    #[test]
    fn legal_status_defaults_to_sin_estado() {
        assert_eq!(LegalStatus::default(), LegalStatus::SinEstado);
        let json = serde_json::to_string(&LegalStatus::SinEstado).unwrap();
        assert_eq!(json, "\"SIN_ESTADO\"");
    }

    #[test]
    fn unknown_state_string_is_rejected() {
        assert!("PENDING".parse::<WorkflowState>().is_err());
        assert!(serde_json::from_str::<WorkflowState>("\"PENDING\"").is_err());
    }

    #[test]
    fn creation_record_omits_null_notes() {
        let rec = TransitionRecord {
            from_state: None,
            to_state: WorkflowState::Draft,
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            user_id: "u-1".to_string(),
            user_role: "ADMIN".to_string(),
            notes: None,
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert!(json.get("notes").is_none());
        assert_eq!(json["from_state"], serde_json::Value::Null);
    }
}
