//! Dial loop with exponential backoff.

use crate::{Backoff, RelayError, RelayResult, SessionEnd};
use async_trait::async_trait;
use relay_config::Config;
use std::future::Future;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// WebSocket stream produced by [`WsDialer`].
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(15);

/// Where and how to connect.
#[derive(Clone)]
pub struct ConnectionDescriptor {
    /// Stream URL (`ws://` or `wss://`).
    pub url: String,
    /// Extra handshake headers.
    pub headers: Vec<(String, String)>,
    /// First retry delay.
    pub min_backoff: Duration,
    /// Upper bound on any retry delay.
    pub max_backoff: Duration,
    /// Consecutive dial failures allowed before giving up. 0 retries forever.
    pub max_retries: u32,
    /// Bound on a single dial including the handshake.
    pub dial_timeout: Duration,
}

impl ConnectionDescriptor {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            min_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(15),
            max_retries: 5,
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
        }
    }

    /// Descriptor for the configured stream, authenticated with `token`.
    pub fn from_config(config: &Config, token: &str) -> Self {
        let mut descriptor = Self::new(config.websocket_url.clone());
        descriptor.min_backoff = config.min_backoff();
        descriptor.max_backoff = config.max_backoff();
        descriptor.max_retries = config.max_retries;
        descriptor.with_bearer(token)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_bearer(self, token: &str) -> Self {
        self.with_header("Authorization", format!("Bearer {token}"))
    }
}

// Headers carry the API key, keep them out of logs.
impl std::fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let header_names: Vec<&str> = self.headers.iter().map(|(name, _)| name.as_str()).collect();
        f.debug_struct("ConnectionDescriptor")
            .field("url", &self.url)
            .field("headers", &header_names)
            .field("min_backoff", &self.min_backoff)
            .field("max_backoff", &self.max_backoff)
            .field("max_retries", &self.max_retries)
            .field("dial_timeout", &self.dial_timeout)
            .finish()
    }
}

/// Opens one connection per call.
#[async_trait]
pub trait Dialer: Send + Sync {
    type Connection: Send;

    async fn dial(&self, descriptor: &ConnectionDescriptor) -> RelayResult<Self::Connection>;
}

/// Dials real WebSocket endpoints, with TLS for `wss://`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsDialer;

#[async_trait]
impl Dialer for WsDialer {
    type Connection = WsStream;

    async fn dial(&self, descriptor: &ConnectionDescriptor) -> RelayResult<WsStream> {
        let mut request = descriptor.url.as_str().into_client_request()?;
        for (name, value) in &descriptor.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| RelayError::Connection(format!("invalid header name {name}: {e}")))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| RelayError::Connection(format!("invalid value for header {name}: {e}")))?;
            request.headers_mut().insert(header_name, header_value);
        }

        let (stream, response) = tokio::time::timeout(descriptor.dial_timeout, connect_async(request))
            .await
            .map_err(|_| RelayError::Timeout)??;

        debug!(status = %response.status(), "WebSocket handshake complete");
        Ok(stream)
    }
}

/// Keep a session running over successive connections until cancellation
/// or until dialing fails `max_retries` times in a row.
///
/// The Nth consecutive dial failure waits `min(min_backoff * 2^(N-1),
/// max_backoff)`. A successful dial resets both the delay and the failure
/// count. A session that closes cleanly is redialed immediately; one that
/// fails waits `min_backoff` first. Neither counts toward the cap.
///
/// Only terminal errors are returned: [`RelayError::Cancelled`] or
/// [`RelayError::RetriesExhausted`].
pub async fn connect_with_retry<D, F, Fut>(
    descriptor: &ConnectionDescriptor,
    dialer: &D,
    cancel: &CancellationToken,
    mut session: F,
) -> RelayError
where
    D: Dialer,
    F: FnMut(D::Connection) -> Fut,
    Fut: Future<Output = SessionEnd>,
{
    let mut backoff = Backoff::new(descriptor.min_backoff, descriptor.max_backoff);
    let mut failures: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return RelayError::Cancelled;
        }

        info!(url = %descriptor.url, "Connecting to event stream");
        let dialed = tokio::select! {
            biased;
            _ = cancel.cancelled() => return RelayError::Cancelled,
            result = dialer.dial(descriptor) => result,
        };

        let connection = match dialed {
            Ok(connection) => connection,
            Err(e) => {
                failures += 1;
                if descriptor.max_retries > 0 && failures >= descriptor.max_retries {
                    error!(
                        url = %descriptor.url,
                        attempts = failures,
                        error = %e,
                        "Giving up on event stream"
                    );
                    return RelayError::RetriesExhausted {
                        url: descriptor.url.clone(),
                        attempts: failures,
                    };
                }

                let delay = backoff.next_delay();
                warn!(
                    url = %descriptor.url,
                    attempt = failures,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Dial failed, retrying"
                );
                if !sleep_or_cancel(delay, cancel).await {
                    return RelayError::Cancelled;
                }
                continue;
            }
        };

        backoff.reset();
        failures = 0;
        info!(url = %descriptor.url, "Connected to event stream");

        match session(connection).await {
            SessionEnd::Cancelled => return RelayError::Cancelled,
            SessionEnd::ClosedNormally => {
                info!("Event stream closed by server, reconnecting");
            }
            SessionEnd::TransportError(e) => {
                let delay = backoff.current();
                warn!(
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "Event stream session failed, reconnecting"
                );
                if !sleep_or_cancel(delay, cancel).await {
                    return RelayError::Cancelled;
                }
            }
        }
    }
}

/// Sleep for `delay`; false if cancelled first.
async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_from_config_carries_backoff_and_token() {
        let mut config = Config::new();
        config.min_backoff_ms = 500;
        config.max_backoff_ms = 8000;
        config.max_retries = 3;

        let descriptor = ConnectionDescriptor::from_config(&config, "abc_dev_key");
        assert_eq!(descriptor.url, config.websocket_url);
        assert_eq!(descriptor.min_backoff, Duration::from_millis(500));
        assert_eq!(descriptor.max_backoff, Duration::from_secs(8));
        assert_eq!(descriptor.max_retries, 3);
        assert_eq!(
            descriptor.headers,
            vec![("Authorization".to_string(), "Bearer abc_dev_key".to_string())]
        );
    }

    #[test]
    fn debug_output_hides_header_values() {
        let descriptor = ConnectionDescriptor::new("ws://localhost:8080/ws").with_bearer("secret-token");
        let rendered = format!("{descriptor:?}");
        assert!(rendered.contains("Authorization"));
        assert!(!rendered.contains("secret-token"));
    }

    #[tokio::test]
    async fn ws_dialer_rejects_invalid_header_name() {
        let descriptor = ConnectionDescriptor::new("ws://127.0.0.1:9/ws").with_header("bad header", "x");
        let result = WsDialer.dial(&descriptor).await;
        assert!(matches!(result, Err(RelayError::Connection(_))));
    }
}
