//! Snapshot error types.

use folio_storage::StorageError;
use thiserror::Error;

/// Result type for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Errors that can occur during snapshot operations.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The document is not loaded (or has been deleted).
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// The snapshot does not exist in the document's history.
    #[error("Snapshot not found: {0}")]
    NotFound(String),

    /// The durability write failed. The in-memory history already reflects
    /// the operation; calling `SnapshotStore::persist` retries the write.
    #[error("Persistence failed: {0}")]
    Persistence(#[from] StorageError),

    /// A retention policy value is outside its allowed set.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl SnapshotError {
    /// Create a snapshot not found error.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    /// Create a document not found error.
    pub fn document_not_found(id: impl Into<String>) -> Self {
        Self::DocumentNotFound(id.into())
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    /// Whether the referenced document or snapshot does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::DocumentNotFound(_))
    }

    /// Whether only the durability write failed.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_variants_are_classified() {
        assert!(SnapshotError::not_found("snp_1").is_not_found());
        assert!(SnapshotError::document_not_found("doc1").is_not_found());
        assert!(!SnapshotError::invalid_configuration("x").is_not_found());
    }

    #[test]
    fn persistence_wraps_storage_error() {
        let err = SnapshotError::from(StorageError::unavailable("offline"));
        assert!(err.is_persistence());
        assert_eq!(
            err.to_string(),
            "Persistence failed: Storage unavailable: offline"
        );
    }

    #[test]
    fn messages_name_the_missing_thing() {
        assert_eq!(
            SnapshotError::document_not_found("doc1").to_string(),
            "Document not found: doc1"
        );
        assert_eq!(
            SnapshotError::not_found("bad-id").to_string(),
            "Snapshot not found: bad-id"
        );
    }
}
