/// All errors that can be returned by a DocumentStorage implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Optimistic concurrency control conflict — another transaction modified
    /// the document concurrently. The expected version was not found.
    #[error("concurrent conflict on document {document_id}: expected version {expected_version}")]
    ConcurrentConflict {
        document_id: String,
        expected_version: i64,
    },

    /// No document with the given identifier.
    #[error("document not found: {document_id}")]
    DocumentNotFound { document_id: String },

    /// A document with this identifier already exists.
    #[error("document already exists: {document_id}")]
    AlreadyExists { document_id: String },

    /// A backend-specific storage error (DB connection, serialization, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}
