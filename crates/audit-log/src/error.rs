//! Audit error types.

use thiserror::Error;

/// Audit sink error type.
#[derive(Error, Debug)]
pub enum AuditError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using AuditError.
pub type AuditResult<T> = Result<T, AuditError>;
