//! boletin-engine: the storage-coupled side of the workflow.
//!
//! Drives validated document transitions through a [`DocumentStorage`]
//! backend using snapshot (transaction) semantics: the state column update
//! and the audit row insert either both commit or neither does. A racing
//! transition on the same document loses the version check and surfaces
//! [`StorageError::ConcurrentConflict`].
//!
//! [`DocumentStorage`]: boletin_storage::DocumentStorage
//! [`StorageError::ConcurrentConflict`]: boletin_storage::StorageError

mod assemble;
mod error;
mod executor;

pub use assemble::{assemble_document, record_from_document, row_from_transition};
pub use error::EngineError;
pub use executor::{
    create_document, get_document, list_documents, transition_document, update_document,
};
