//! Store error handling
//!
//! Typed errors for document store operations, with recovery hints.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::models::DocumentId;

/// Errors that can occur during document store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// A required field was empty; nothing was written
    #[error("Validation failed: {field} must not be empty")]
    Validation { field: &'static str },

    /// A reorder batch named the same document twice
    #[error("Validation failed: document {id} appears more than once in reorder")]
    DuplicateOrder { id: DocumentId },

    /// No integer key is left above the current first document
    #[error("Cannot place a new document first: display order exhausted")]
    OrderExhausted,

    /// The referenced document does not exist
    #[error("Document not found: {id}")]
    NotFound { id: DocumentId },

    /// The underlying database failed or a transaction was aborted
    #[error("Storage fault: {0}")]
    StorageFault(#[from] rusqlite::Error),

    /// Failed to create data directory
    #[error("Failed to create data directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The background task running a store call did not complete
    #[error("Store task failed: {0}")]
    TaskFailed(String),
}

impl StoreError {
    /// Whether the caller can recover without intervention (re-prompt,
    /// treat as absent)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StoreError::Validation { .. }
                | StoreError::DuplicateOrder { .. }
                | StoreError::NotFound { .. }
        )
    }

    /// Whether this is a storage-level failure rather than a caller error
    pub fn is_storage_fault(&self) -> bool {
        matches!(
            self,
            StoreError::StorageFault(_)
                | StoreError::OrderExhausted
                | StoreError::CreateDirectory { .. }
                | StoreError::TaskFailed(_)
        )
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StoreError::Validation { .. } => Some("Enter a title and some content, then save again."),
            StoreError::NotFound { .. } => {
                Some("The document may already have been deleted. Refresh the list.")
            }
            StoreError::OrderExhausted => {
                Some("Reorder the list once to renumber it, then create the document again.")
            }
            StoreError::CreateDirectory { .. } => {
                Some("Check that the parent directory exists and you have write permissions.")
            }
            StoreError::StorageFault(_) => {
                Some("No changes were applied. Check the database file and try again.")
            }
            _ => None,
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
