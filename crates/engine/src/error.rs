use boletin_core::WorkflowError;
use boletin_storage::StorageError;

/// Errors surfaced by the executor: either the workflow rejected the
/// transition, or the storage backend failed.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
