//! Error types for graph-store operations.

use thiserror::Error;

/// The error type for graph-store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No object exists under the given ID (either variant).
    #[error("Object not found: {0}")]
    NotFound(String),

    /// The request was malformed (unknown relationship endpoint, bad budget, ...).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The store could not be reached or failed to answer.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A unique ID could not be generated.
    #[error("ID generation failed: {0}")]
    IdGeneration(#[from] crate::id_generation::IdGenerationError),
}

/// A specialized Result type for graph-store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
