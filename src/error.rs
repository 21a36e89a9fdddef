//! Error taxonomy shared by the engine, the store seams, and the HTTP layer.
//!
//! `isSpam` and the recommendation are ordinary return values; nothing in here is
//! used to signal a verdict.

use thiserror::Error;

/// Errors raised by an external store implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("revision mismatch on {id}: expected {expected}, found {actual}")]
    Conflict {
        id: String,
        expected: u64,
        actual: u64,
    },

    #[error("store unavailable: {0}")]
    Backend(String),
}

/// Errors surfaced to callers of the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Missing or empty required input. Never retried automatically.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("detection not found: {0}")]
    NotFound(String),

    /// Optimistic revision check failed on review.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backing store is unreachable or errored.
    #[error("dependency error: {0}")]
    Dependency(String),
}

impl EngineError {
    /// Short machine-readable code used in API error bodies and logs.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "validation_error",
            EngineError::NotFound(_) => "not_found",
            EngineError::Conflict(_) => "conflict",
            EngineError::Dependency(_) => "dependency_error",
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => EngineError::NotFound(id),
            e @ StoreError::Conflict { .. } => EngineError::Conflict(e.to_string()),
            StoreError::Backend(msg) => EngineError::Dependency(msg),
        }
    }
}
