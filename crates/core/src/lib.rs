//! boletin-core: document model and workflow state machine.
//!
//! A `Document` is a regulation or bulletin record moving through the
//! publication workflow DRAFT -> REVIEW -> APPROVED -> PUBLISHED -> ARCHIVED.
//! Every state change is validated against a fixed adjacency table and
//! appends one immutable [`TransitionRecord`] to the document's history.
//!
//! # Public API
//!
//! - [`allowed_transitions()`] -- reachable target states for a given state
//! - [`Document::create()`] -- new document in DRAFT with its creation record
//! - [`Document::apply_transition()`] -- validated in-memory state change
//! - [`WorkflowError`] -- the single domain error, `InvalidTransition`
//!
//! This crate is pure: no I/O, no clock. Callers supply timestamps as
//! RFC 3339 strings.

pub mod error;
pub mod types;
pub mod workflow;

pub use error::WorkflowError;
pub use types::{
    Actor, Document, DocumentDraft, DocumentFilter, DocumentType, LegalStatus, TransitionRecord,
    WorkflowState,
};
pub use workflow::allowed_transitions;
