//! Listener entry points.

use crate::{
    connect_with_retry, run_mock, run_stream_session, ConnectionDescriptor, ConsoleDisplay,
    Dialer, Dispatcher, DisplaySink, Forwarder, RelayResult, SessionSettings, WsDialer,
};
use audit_log::AuditSink;
use relay_config::Config;
use reqwest::Client;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;
use tracing::info;
use webhook_signing::generate_mock_secret;

/// Receives events from the stream (or the simulator) and forwards each one,
/// signed, to a local URL.
pub struct Listener {
    config: Config,
    client: Client,
    forward_url: String,
    token: String,
    audit: Arc<dyn AuditSink>,
    display: Arc<dyn DisplaySink>,
    signing_secret: String,
}

impl Listener {
    /// Create a listener. Without a configured signing secret a
    /// `whsec_mock_` secret is generated for this instance.
    pub fn new(
        config: Config,
        client: Client,
        forward_url: impl Into<String>,
        token: impl Into<String>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let signing_secret = config
            .signing_secret
            .clone()
            .filter(|secret| !secret.is_empty())
            .unwrap_or_else(generate_mock_secret);
        let display = Arc::new(ConsoleDisplay::new(config.verbose));

        Self {
            config,
            client,
            forward_url: forward_url.into(),
            token: token.into(),
            audit,
            display,
            signing_secret,
        }
    }

    /// Replace the console output.
    pub fn with_display(mut self, display: Arc<dyn DisplaySink>) -> Self {
        self.display = display;
        self
    }

    /// Secret forwarded payloads are signed with.
    pub fn signing_secret(&self) -> &str {
        &self.signing_secret
    }

    pub fn forward_url(&self) -> &str {
        &self.forward_url
    }

    fn dispatcher(&self) -> Dispatcher {
        let forwarder = Forwarder::new(
            self.client.clone(),
            self.forward_url.clone(),
            self.signing_secret.clone(),
            self.audit.clone(),
            self.display.clone(),
        );
        Dispatcher::forwarding(Arc::new(forwarder), self.audit.clone(), self.display.clone())
            .with_concurrency(self.config.forward_concurrency)
            .with_shutdown_grace(self.config.shutdown_grace())
    }

    /// Run until cancelled or until dialing gives up.
    ///
    /// Returns [`crate::RelayError::Cancelled`] on cancellation, which callers
    /// should treat as a clean exit.
    pub async fn listen(&self, cancel: &CancellationToken, mock: bool) -> RelayResult<()> {
        if mock {
            info!(forward_url = %self.forward_url, "Starting webhook listener in mock mode");
            return run_mock(&self.dispatcher(), self.config.mock_interval(), cancel).await;
        }
        self.listen_via(&WsDialer, cancel).await
    }

    /// [`Listener::listen`] over connections opened by `dialer`.
    pub async fn listen_via<D, T>(&self, dialer: &D, cancel: &CancellationToken) -> RelayResult<()>
    where
        D: Dialer<Connection = WebSocketStream<T>>,
        T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        self.config.websocket_url()?;
        info!(
            url = %self.config.websocket_url,
            forward_url = %self.forward_url,
            "Starting webhook listener"
        );

        let descriptor = ConnectionDescriptor::from_config(&self.config, &self.token);
        let dispatcher = self.dispatcher();
        let settings = SessionSettings::from_config(&self.config);

        Err(run_connected(&descriptor, dialer, &dispatcher, &settings, cancel).await)
    }
}

/// Displays events from the stream without forwarding them.
pub struct TailListener {
    config: Config,
    token: String,
    display: Arc<dyn DisplaySink>,
}

impl TailListener {
    pub fn new(config: Config, token: impl Into<String>, display: Arc<dyn DisplaySink>) -> Self {
        Self {
            config,
            token: token.into(),
            display,
        }
    }

    pub async fn listen(&self, cancel: &CancellationToken) -> RelayResult<()> {
        self.listen_via(&WsDialer, cancel).await
    }

    pub async fn listen_via<D, T>(&self, dialer: &D, cancel: &CancellationToken) -> RelayResult<()>
    where
        D: Dialer<Connection = WebSocketStream<T>>,
        T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        self.config.websocket_url()?;
        info!(url = %self.config.websocket_url, "Tailing event stream");

        let descriptor = ConnectionDescriptor::from_config(&self.config, &self.token);
        let dispatcher = Dispatcher::tail(self.display.clone());
        let settings = SessionSettings::from_config(&self.config);

        Err(run_connected(&descriptor, dialer, &dispatcher, &settings, cancel).await)
    }
}

async fn run_connected<D, T>(
    descriptor: &ConnectionDescriptor,
    dialer: &D,
    dispatcher: &Dispatcher,
    settings: &SessionSettings,
    cancel: &CancellationToken,
) -> crate::RelayError
where
    D: Dialer<Connection = WebSocketStream<T>>,
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    connect_with_retry(descriptor, dialer, cancel, move |connection| {
        run_stream_session(connection, dispatcher, settings, cancel)
    })
    .await
}
