//! The workflow state machine: adjacency table, validation, and the
//! in-memory transition step.
//!
//! The adjacency table is the single source of truth for every layer --
//! server-side validation, the pre-validation HTTP endpoint, and CLI
//! rendering all consume [`allowed_transitions`]. The machine is a directed
//! graph with 5 nodes and 6 edges: a forward-and-back review cycle
//! (draft <-> review <-> approved) funneling into a one-way publish step
//! and a terminal archive step.

use crate::error::WorkflowError;
use crate::types::{Actor, Document, DocumentDraft, TransitionRecord, WorkflowState};

use WorkflowState::*;

/// Target states reachable from `state`.
///
/// ARCHIVED is terminal: the returned slice is empty. REVIEW and APPROVED
/// each permit a single send-back to the immediately preceding state only;
/// PUBLISHED never reverts to APPROVED. A state is never its own successor,
/// so no-op transitions are always rejected.
pub fn allowed_transitions(state: WorkflowState) -> &'static [WorkflowState] {
    match state {
        Draft => &[Review],
        Review => &[Approved, Draft],
        Approved => &[Published, Review],
        Published => &[Archived],
        Archived => &[],
    }
}

/// Whether the edge `from -> to` is in the adjacency table.
pub fn is_allowed(from: WorkflowState, to: WorkflowState) -> bool {
    allowed_transitions(from).contains(&to)
}

impl Document {
    /// Create a document in DRAFT with its synthetic creation record
    /// (`from_state = None`).
    ///
    /// `now` is an RFC 3339 timestamp supplied by the caller; this crate
    /// never reads the clock.
    pub fn create(id: impl Into<String>, draft: DocumentDraft, actor: &Actor, now: &str) -> Self {
        Document {
            id: id.into(),
            doc_type: draft.doc_type,
            special_number: draft.special_number,
            publication_date: draft.publication_date,
            reference: draft.reference,
            content: draft.content,
            keywords: draft.keywords,
            file_url: draft.file_url,
            state: Draft,
            legal_status: draft.legal_status,
            history: vec![TransitionRecord {
                from_state: None,
                to_state: Draft,
                timestamp: now.to_string(),
                user_id: actor.user_id.clone(),
                user_role: actor.user_role.clone(),
                notes: None,
            }],
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }

    /// Apply a validated state change: append one transition record and set
    /// `state`, as a single in-memory step.
    ///
    /// Fails with [`WorkflowError::InvalidTransition`] when `to` is not in
    /// the allowed set for the current state, leaving the document
    /// completely unchanged. No other precondition is enforced -- any actor
    /// may request any allowed transition.
    pub fn apply_transition(
        &mut self,
        to: WorkflowState,
        actor: &Actor,
        notes: Option<String>,
        now: &str,
    ) -> Result<(), WorkflowError> {
        if !is_allowed(self.state, to) {
            return Err(WorkflowError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.history.push(TransitionRecord {
            from_state: Some(self.state),
            to_state: to,
            timestamp: now.to_string(),
            user_id: actor.user_id.clone(),
            user_role: actor.user_role.clone(),
            notes,
        });
        self.state = to;
        self.updated_at = now.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DocumentType, LegalStatus};

    fn admin() -> Actor {
        Actor::new("u-1", "ADMIN")
    }

    fn draft_payload() -> DocumentDraft {
        DocumentDraft {
            doc_type: DocumentType::Decree,
            special_number: "123/2026".to_string(),
            publication_date: "2026-03-01".to_string(),
            reference: "EXP-2026-000123".to_string(),
            content: "Decreto de prueba".to_string(),
            keywords: vec!["tasas".to_string(), "presupuesto".to_string()],
            file_url: None,
            legal_status: LegalStatus::default(),
        }
    }

    fn new_doc() -> Document {
        Document::create("doc-1", draft_payload(), &admin(), "2026-01-01T00:00:00Z")
    }

    #[test]
    fn adjacency_table_matches_lifecycle() {
        assert_eq!(allowed_transitions(Draft), &[Review]);
        assert_eq!(allowed_transitions(Review), &[Approved, Draft]);
        assert_eq!(allowed_transitions(Approved), &[Published, Review]);
        assert_eq!(allowed_transitions(Published), &[Archived]);
    }

    #[test]
    fn archived_is_terminal() {
        assert!(allowed_transitions(Archived).is_empty());
    }

    #[test]
    fn no_state_is_its_own_successor() {
        for state in WorkflowState::ALL {
            assert!(
                !is_allowed(state, state),
                "{state} must not allow a no-op transition"
            );
        }
    }

    #[test]
    fn table_has_exactly_six_edges() {
        let edges: usize = WorkflowState::ALL
            .iter()
            .map(|s| allowed_transitions(*s).len())
            .sum();
        assert_eq!(edges, 6);
    }

    #[test]
    fn create_yields_draft_with_single_creation_record() {
        let doc = new_doc();
        assert_eq!(doc.state, Draft);
        assert_eq!(doc.history.len(), 1);
        assert_eq!(doc.history[0].from_state, None);
        assert_eq!(doc.history[0].to_state, Draft);
        assert_eq!(doc.history[0].user_id, "u-1");
    }

    #[test]
    fn draft_to_review_succeeds() {
        let mut doc = new_doc();
        doc.apply_transition(Review, &admin(), None, "2026-01-02T00:00:00Z")
            .unwrap();
        assert_eq!(doc.state, Review);
        assert_eq!(doc.history.len(), 2);
        let last = doc.history.last().unwrap();
        assert_eq!(last.from_state, Some(Draft));
        assert_eq!(last.to_state, Review);
        assert_eq!(doc.updated_at, "2026-01-02T00:00:00Z");
    }

    #[test]
    fn review_to_published_fails_and_leaves_document_unchanged() {
        let mut doc = new_doc();
        doc.apply_transition(Review, &admin(), None, "2026-01-02T00:00:00Z")
            .unwrap();
        let before = doc.clone();

        let err = doc
            .apply_transition(Published, &admin(), None, "2026-01-03T00:00:00Z")
            .unwrap_err();
        assert_eq!(
            err,
            WorkflowError::InvalidTransition {
                from: Review,
                to: Published,
            }
        );
        assert_eq!(doc, before);
    }

    #[test]
    fn send_back_from_approved_reaches_review() {
        let mut doc = new_doc();
        doc.apply_transition(Review, &admin(), None, "t1").unwrap();
        doc.apply_transition(Approved, &admin(), None, "t2").unwrap();
        doc.apply_transition(Review, &admin(), Some("needs corrections".to_string()), "t3")
            .unwrap();
        assert_eq!(doc.state, Review);
        assert_eq!(allowed_transitions(doc.state), &[Approved, Draft]);
        assert_eq!(
            doc.history.last().unwrap().notes.as_deref(),
            Some("needs corrections")
        );
    }

    #[test]
    fn published_to_archived_is_terminal() {
        let mut doc = new_doc();
        doc.apply_transition(Review, &admin(), None, "t1").unwrap();
        doc.apply_transition(Approved, &admin(), None, "t2").unwrap();
        doc.apply_transition(Published, &admin(), None, "t3").unwrap();
        doc.apply_transition(Archived, &admin(), None, "t4").unwrap();
        assert!(allowed_transitions(doc.state).is_empty());
    }

    #[test]
    fn history_is_chained_after_full_lifecycle() {
        let mut doc = new_doc();
        let path = [Review, Approved, Review, Approved, Published, Archived];
        for (i, to) in path.iter().enumerate() {
            doc.apply_transition(*to, &admin(), None, &format!("t{i}"))
                .unwrap();
        }
        // N transitions from creation => N + 1 entries.
        assert_eq!(doc.history.len(), path.len() + 1);
        for pair in doc.history.windows(2) {
            assert_eq!(Some(pair[0].to_state), pair[1].from_state);
        }
        assert_eq!(doc.state, doc.history.last().unwrap().to_state);
    }

    #[test]
    fn published_cannot_revert_to_approved() {
        let mut doc = new_doc();
        doc.apply_transition(Review, &admin(), None, "t1").unwrap();
        doc.apply_transition(Approved, &admin(), None, "t2").unwrap();
        doc.apply_transition(Published, &admin(), None, "t3").unwrap();
        assert!(doc
            .apply_transition(Approved, &admin(), None, "t4")
            .is_err());
        assert_eq!(doc.state, Published);
    }

    #[test]
    fn draft_cannot_skip_to_approved() {
        let mut doc = new_doc();
        let err = doc
            .apply_transition(Approved, &admin(), None, "t1")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid transition from DRAFT to APPROVED"
        );
    }
}
