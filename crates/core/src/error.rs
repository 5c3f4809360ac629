use crate::types::WorkflowState;

/// The single domain error of the workflow engine.
///
/// Always recoverable: the caller can re-inspect
/// [`allowed_transitions`](crate::workflow::allowed_transitions) and retry
/// with a valid target.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    /// The requested target state is not reachable from the current state.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        from: WorkflowState,
        to: WorkflowState,
    },
}
