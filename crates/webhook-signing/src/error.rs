//! Signature error types.

use thiserror::Error;

/// Error returned when a signature header cannot be verified.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SigningError {
    /// Header is not of the form `t=<ts>,v1=<hex>`
    #[error("Malformed signature header: {0}")]
    MalformedHeader(String),

    /// No `v1` signature matched the payload
    #[error("Signature does not match payload")]
    Mismatch,

    /// The secret was rejected as an HMAC key
    #[error("Invalid signing key: {0}")]
    InvalidKey(String),

    /// Timestamp is further from now than the allowed tolerance
    #[error("Signature timestamp {timestamp} is outside the {tolerance_secs}s tolerance")]
    Expired { timestamp: i64, tolerance_secs: u64 },
}

/// Result type alias using SigningError.
pub type SigningResult<T> = Result<T, SigningError>;
