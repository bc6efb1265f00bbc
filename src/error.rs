//! Error types for the retrieval service
//!
//! Layer-specific errors (vector, storage, journal) are folded into
//! [`RetrievalError`] at the pipeline boundary. Callers can tell their own
//! mistakes ([`RetrievalError::is_client_error`]) apart from faults in the
//! service itself.

use crate::journal::JournalError;
use crate::vector::VectorError;
use thiserror::Error;

/// Main error type for ingestion and search operations
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Embedding validation errors (dimension, non-finite values, k)
    #[error(transparent)]
    Vector(#[from] VectorError),

    /// Request parameters outside what the service accepts
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// Durability layer errors
    #[error(transparent)]
    Journal(#[from] JournalError),

    /// The index and document store disagree. Always a bug in the ingestion gate.
    #[error("Internal invariant violated: {reason}")]
    InvariantViolation { reason: String },
}

impl RetrievalError {
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Get a stable status code for this error type.
    ///
    /// Returns a string identifier that can be used in JSON responses
    /// for programmatic error handling.
    pub fn status_code(&self) -> &'static str {
        match self {
            Self::Vector(VectorError::DimensionMismatch { .. }) => "DIMENSION_MISMATCH",
            Self::Vector(VectorError::NonFiniteComponent { .. }) => "NON_FINITE_EMBEDDING",
            Self::Vector(VectorError::InvalidDimension { .. }) => "INVALID_DIMENSION",
            Self::Vector(VectorError::InvalidK) | Self::InvalidRequest { .. } => "INVALID_REQUEST",
            Self::Journal(JournalError::Corrupted { .. }) => "JOURNAL_CORRUPTED",
            Self::Journal(JournalError::DimensionConflict { .. }) => "JOURNAL_DIMENSION_CONFLICT",
            Self::Journal(_) => "JOURNAL_ERROR",
            Self::InvariantViolation { .. } => "INVARIANT_VIOLATION",
        }
    }

    /// Whether the caller caused this error (bad input) rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Vector(_) | Self::InvalidRequest { .. })
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::Vector(VectorError::DimensionMismatch { .. }) => vec![
                "Check which embedding model produced the vectors",
                "Run 'retriever info' to see the dimension the store expects",
            ],
            Self::Vector(VectorError::NonFiniteComponent { .. }) => {
                vec!["Drop or re-embed documents whose vectors contain NaN or infinity"]
            }
            Self::Vector(VectorError::InvalidK) | Self::InvalidRequest { .. } => vec![
                "top_k must be at least 1 and no larger than search.max_top_k",
                "threshold must be a number",
            ],
            Self::Journal(JournalError::Corrupted { .. }) => vec![
                "Move the journal file aside to start with an empty store",
                "Restore the journal directory from a backup",
            ],
            Self::Journal(JournalError::DimensionConflict { .. }) => vec![
                "Set store.dimension to the value the journal was created with",
                "Point journal.path at a fresh directory for the new dimension",
            ],
            Self::Journal(_) => vec![
                "The batch was not applied; the store is unchanged",
                "Check disk space and permissions of journal.path",
            ],
            Self::InvariantViolation { .. } => vec![
                "Restart the service; the in-memory store may be inconsistent",
                "Report this as a bug together with the server log",
            ],
            _ => vec![],
        }
    }
}

/// Result type alias for retrieval operations
pub type RetrievalResult<T> = Result<T, RetrievalError>;
