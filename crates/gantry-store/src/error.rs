//! Error types for the gantry storage layer.

use thiserror::Error;

/// Errors produced by corpus and feedback storage backends.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Feedback record not found by id.
    #[error("feedback record not found: {id}")]
    FeedbackNotFound { id: uuid::Uuid },

    /// Signature string is not 64 lowercase hex chars.
    #[error("invalid signature: {given}")]
    InvalidSignature { given: String },

    /// Underlying filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Record (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for storage operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
