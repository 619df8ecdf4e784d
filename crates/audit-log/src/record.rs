//! Audit record types.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Severity written with each record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditLevel {
    Info,
    Error,
}

/// One audit event, tagged by `msg`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msg", rename_all = "snake_case")]
pub enum AuditRecord {
    /// An envelope arrived from the event stream.
    WebhookReceived {
        event: String,
        id: Option<String>,
        timestamp: String,
        size_bytes: usize,
        raw_message: String,
    },
    /// The local endpoint answered 2xx.
    WebhookForwarded {
        url: String,
        status_code: u16,
        duration_ms: u64,
        timestamp: String,
        size_bytes: usize,
    },
    /// The local endpoint answered outside 2xx.
    WebhookForwardError {
        url: String,
        status_code: u16,
        duration_ms: u64,
        response_body: String,
        timestamp: String,
    },
    /// The request never got a response.
    WebhookForwardFailed {
        url: String,
        error: String,
        duration_ms: u64,
        timestamp: String,
    },
}

impl AuditRecord {
    /// The `msg` value this record is written under.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::WebhookReceived { .. } => "webhook_received",
            Self::WebhookForwarded { .. } => "webhook_forwarded",
            Self::WebhookForwardError { .. } => "webhook_forward_error",
            Self::WebhookForwardFailed { .. } => "webhook_forward_failed",
        }
    }

    pub fn level(&self) -> AuditLevel {
        match self {
            Self::WebhookReceived { .. } | Self::WebhookForwarded { .. } => AuditLevel::Info,
            Self::WebhookForwardError { .. } | Self::WebhookForwardFailed { .. } => {
                AuditLevel::Error
            }
        }
    }

    /// Current time in the format used by the `timestamp` fields.
    pub fn now_timestamp() -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

/// A record as written to disk: write time and level, then the record fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub time: String,
    pub level: AuditLevel,
    #[serde(flatten)]
    pub record: AuditRecord,
}

impl AuditEntry {
    pub fn new(record: AuditRecord) -> Self {
        Self {
            time: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            level: record.level(),
            record,
        }
    }
}
