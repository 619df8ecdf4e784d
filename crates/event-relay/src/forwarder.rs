//! Signed delivery of raw payloads to the local endpoint.

use crate::{DisplaySink, RelayError, RelayResult};
use audit_log::{AuditRecord, AuditSink};
use chrono::Utc;
use relay_config::Config;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use webhook_signing::{format_header, sign, SIGNATURE_HEADER};

/// Build the HTTP client used for forwarding.
pub fn build_http_client(config: &Config) -> RelayResult<Client> {
    Ok(Client::builder().timeout(config.http_timeout()).build()?)
}

/// Result of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// 2xx response.
    Forwarded {
        status: u16,
        duration: Duration,
        size_bytes: usize,
    },
    /// Response outside 2xx.
    ForwardError {
        status: u16,
        duration: Duration,
        response_body: String,
    },
    /// No response at all.
    ForwardFailed { error: String, duration: Duration },
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Forwarded { .. })
    }

    /// Audit record for this outcome against `url`.
    pub fn to_record(&self, url: &str) -> AuditRecord {
        let timestamp = AuditRecord::now_timestamp();
        match self {
            Self::Forwarded {
                status,
                duration,
                size_bytes,
            } => AuditRecord::WebhookForwarded {
                url: url.to_string(),
                status_code: *status,
                duration_ms: duration.as_millis() as u64,
                timestamp,
                size_bytes: *size_bytes,
            },
            Self::ForwardError {
                status,
                duration,
                response_body,
            } => AuditRecord::WebhookForwardError {
                url: url.to_string(),
                status_code: *status,
                duration_ms: duration.as_millis() as u64,
                response_body: response_body.clone(),
                timestamp,
            },
            Self::ForwardFailed { error, duration } => AuditRecord::WebhookForwardFailed {
                url: url.to_string(),
                error: error.clone(),
                duration_ms: duration.as_millis() as u64,
                timestamp,
            },
        }
    }
}

/// POSTs payloads to one local URL with a fresh signature per request.
pub struct Forwarder {
    client: Client,
    url: String,
    signing_secret: String,
    audit: Arc<dyn AuditSink>,
    display: Arc<dyn DisplaySink>,
}

impl Forwarder {
    pub fn new(
        client: Client,
        url: impl Into<String>,
        signing_secret: impl Into<String>,
        audit: Arc<dyn AuditSink>,
        display: Arc<dyn DisplaySink>,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            signing_secret: signing_secret.into(),
            audit,
            display,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn signing_secret(&self) -> &str {
        &self.signing_secret
    }

    /// Send `payload` unchanged, signed at the current time. Never retries.
    pub async fn deliver(&self, payload: &[u8]) -> DeliveryOutcome {
        let timestamp = Utc::now().timestamp();
        let started = Instant::now();
        let signature = match sign(&self.signing_secret, timestamp, payload) {
            Ok(signature) => signature,
            Err(e) => {
                return DeliveryOutcome::ForwardFailed {
                    error: e.to_string(),
                    duration: started.elapsed(),
                }
            }
        };

        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, format_header(timestamp, &signature))
            .body(payload.to_vec())
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                return DeliveryOutcome::ForwardFailed {
                    error: e.to_string(),
                    duration: started.elapsed(),
                }
            }
        };

        let status = response.status();
        if status.is_success() {
            return DeliveryOutcome::Forwarded {
                status: status.as_u16(),
                duration: started.elapsed(),
                size_bytes: payload.len(),
            };
        }

        let response_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!(error = %e, "Failed to read error response body");
                String::new()
            }
        };
        DeliveryOutcome::ForwardError {
            status: status.as_u16(),
            duration: started.elapsed(),
            response_body,
        }
    }

    /// Deliver, audit and display one event.
    ///
    /// Returns [`RelayError::ForwardStatus`] for non-2xx responses and the
    /// transport error when no response arrived. Outcomes are audited either way.
    pub async fn forward(&self, payload: &[u8], event: &str) -> RelayResult<()> {
        let outcome = self.deliver(payload).await;

        if let Err(e) = self.audit.record(outcome.to_record(&self.url)) {
            warn!(error = %e, "Failed to write audit record");
        }

        match outcome {
            DeliveryOutcome::Forwarded {
                status, duration, ..
            } => {
                info!(
                    event = %event,
                    status,
                    duration_ms = duration.as_millis() as u64,
                    "Webhook forwarded"
                );
                self.display.forwarded(event, status);
                Ok(())
            }
            DeliveryOutcome::ForwardError {
                status, duration, ..
            } => {
                warn!(
                    event = %event,
                    status,
                    duration_ms = duration.as_millis() as u64,
                    "Forward target returned error status"
                );
                self.display.forwarded(event, status);
                Err(RelayError::ForwardStatus { status })
            }
            DeliveryOutcome::ForwardFailed { error, duration } => {
                warn!(
                    event = %event,
                    url = %self.url,
                    duration_ms = duration.as_millis() as u64,
                    error = %error,
                    "Webhook forward failed"
                );
                self.display
                    .warning(&format!("Failed to forward {event} to {}: {error}", self.url));
                Err(RelayError::Connection(error))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_records_match_kinds() {
        let url = "http://localhost:3000/webhooks";
        let forwarded = DeliveryOutcome::Forwarded {
            status: 200,
            duration: Duration::from_millis(12),
            size_bytes: 40,
        };
        assert!(forwarded.is_success());
        assert!(matches!(
            forwarded.to_record(url),
            AuditRecord::WebhookForwarded {
                status_code: 200,
                duration_ms: 12,
                size_bytes: 40,
                ..
            }
        ));

        let error = DeliveryOutcome::ForwardError {
            status: 500,
            duration: Duration::from_millis(3),
            response_body: "boom".to_string(),
        };
        assert!(!error.is_success());
        assert_eq!(error.to_record(url).kind(), "webhook_forward_error");

        let failed = DeliveryOutcome::ForwardFailed {
            error: "connection refused".to_string(),
            duration: Duration::from_millis(1),
        };
        assert_eq!(failed.to_record(url).kind(), "webhook_forward_failed");
    }

    #[test]
    fn http_client_builds_from_default_config() {
        assert!(build_http_client(&Config::new()).is_ok());
    }
}
