//! Relay error types.

use thiserror::Error;

/// Relay error type.
#[derive(Error, Debug)]
pub enum RelayError {
    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Audit sink error
    #[error("Audit error: {0}")]
    Audit(#[from] audit_log::AuditError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] relay_config::ConfigError),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Dial attempts exhausted the configured cap
    #[error("Failed to connect to {url} after {attempts} attempts")]
    RetriesExhausted { url: String, attempts: u32 },

    /// Forward target answered outside 2xx
    #[error("Forward target returned HTTP {status}")]
    ForwardStatus { status: u16 },

    /// Keepalive probe could not be sent
    #[error("Heartbeat failed: {0}")]
    Heartbeat(String),

    /// Unknown sample event kind
    #[error("Unknown event type: {0}. Available: billing.paid, payout.done, payout.failed")]
    UnknownEvent(String),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Shutdown was requested
    #[error("Operation cancelled")]
    Cancelled,
}

impl RelayError {
    /// Cancellation is a clean shutdown, not a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result type alias using RelayError.
pub type RelayResult<T> = Result<T, RelayError>;
