//! Error types for format engine operations.

use thiserror::Error;

use crate::store::StoreError;

/// Result type for format engine operations.
pub type FormatResult<T> = Result<T, FormatError>;

/// Errors that can occur in format engine operations.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Element geometry is unusable (non-finite or non-positive size).
    #[error("Invalid geometry for element {id}: {reason}")]
    InvalidGeometry {
        /// Offending element.
        id: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A layout context with unusable dimensions.
    #[error("Invalid layout context: {0}")]
    InvalidContext(String),

    /// An explicitly requested preset is not registered.
    #[error("Preset not found: {0}")]
    PresetNotFound(String),

    /// An imported project record was rejected.
    #[error("Import rejected: {0}")]
    ImportRejected(String),

    /// Key-value layer failure.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
