//! Per-connection session: read loop, dispatch and forward task pool.

use crate::heartbeat::CLOSE_DEADLINE;
use crate::{
    run_heartbeat, ConnectionWriter, DisplaySink, Envelope, EventSource, Forwarder, SessionEnd,
    SourceItem, StreamSource,
};
use audit_log::{AuditRecord, AuditSink};
use futures_util::StreamExt;
use relay_config::Config;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Forward tasks allowed in flight per session by default.
pub const DEFAULT_FORWARD_CONCURRENCY: usize = 10;

const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// What a session does with each envelope after showing it.
#[derive(Clone)]
pub enum DispatchMode {
    /// Audit it and forward it to the local endpoint.
    Forward {
        forwarder: Arc<Forwarder>,
        audit: Arc<dyn AuditSink>,
    },
    /// Display only.
    Tail,
}

/// Per-envelope handling shared by every session of a listener.
#[derive(Clone)]
pub struct Dispatcher {
    mode: DispatchMode,
    display: Arc<dyn DisplaySink>,
    concurrency: usize,
    shutdown_grace: Duration,
}

impl Dispatcher {
    pub fn forwarding(
        forwarder: Arc<Forwarder>,
        audit: Arc<dyn AuditSink>,
        display: Arc<dyn DisplaySink>,
    ) -> Self {
        Self::new(DispatchMode::Forward { forwarder, audit }, display)
    }

    pub fn tail(display: Arc<dyn DisplaySink>) -> Self {
        Self::new(DispatchMode::Tail, display)
    }

    fn new(mode: DispatchMode, display: Arc<dyn DisplaySink>) -> Self {
        Self {
            mode,
            display,
            concurrency: DEFAULT_FORWARD_CONCURRENCY,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }

    /// Cap on concurrent forward tasks per session (at least 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// How long in-flight forwards may run after cancellation.
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn mode(&self) -> &DispatchMode {
        &self.mode
    }
}

/// Timing for live stream sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub heartbeat_interval: Duration,
    pub read_deadline: Duration,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            heartbeat_interval: config.heartbeat_interval(),
            read_deadline: config.read_deadline(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(30),
            read_deadline: Duration::from_secs(90),
        }
    }
}

/// Forward tasks spawned by one session.
struct SessionTasks<'a> {
    dispatcher: &'a Dispatcher,
    tasks: JoinSet<()>,
    permits: Arc<Semaphore>,
}

impl<'a> SessionTasks<'a> {
    fn new(dispatcher: &'a Dispatcher) -> Self {
        Self {
            dispatcher,
            tasks: JoinSet::new(),
            permits: Arc::new(Semaphore::new(dispatcher.concurrency)),
        }
    }

    /// Handle one raw frame. Returns false if cancelled while waiting for
    /// a forward slot.
    async fn handle_frame(&mut self, raw: Vec<u8>, cancel: &CancellationToken) -> bool {
        let dispatcher = self.dispatcher;
        let size_bytes = raw.len();
        let envelope = match Envelope::parse(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(size_bytes, error = %e, "Discarding malformed frame");
                dispatcher
                    .display
                    .warning(&format!("Received invalid message: {e}"));
                return true;
            }
        };

        debug!(
            event = %envelope.event,
            id = envelope.id.as_deref().unwrap_or(""),
            size_bytes,
            "Event received"
        );

        let DispatchMode::Forward { forwarder, audit } = &dispatcher.mode else {
            dispatcher.display.received(&envelope);
            return true;
        };

        if let Err(e) = audit.record(received_record(&envelope)) {
            warn!(error = %e, "Failed to write audit record");
        }
        dispatcher.display.received(&envelope);

        let Some(permit) = self.acquire(cancel).await else {
            debug!(event = %envelope.event, "Cancelled before forwarding");
            return false;
        };
        self.reap();

        let forwarder = forwarder.clone();
        self.tasks.spawn(async move {
            let _permit = permit;
            if let Err(e) = forwarder.forward(envelope.raw(), &envelope.event).await {
                debug!(event = %envelope.event, error = %e, "Forward did not succeed");
            }
        });
        true
    }

    async fn acquire(&self, cancel: &CancellationToken) -> Option<OwnedSemaphorePermit> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            permit = self.permits.clone().acquire_owned() => permit.ok(),
        }
    }

    /// Collect tasks that already finished.
    fn reap(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            log_join(result);
        }
    }

    /// Wait for in-flight forwards. After cancellation the wait is bounded
    /// by the shutdown grace and stragglers are aborted.
    async fn drain(mut self, cancelled: bool) {
        if self.tasks.is_empty() {
            return;
        }

        if !cancelled {
            while let Some(result) = self.tasks.join_next().await {
                log_join(result);
            }
            return;
        }

        let grace = self.dispatcher.shutdown_grace;
        debug!(pending = self.tasks.len(), "Waiting for in-flight forwards");
        let finished = tokio::time::timeout(grace, async {
            while let Some(result) = self.tasks.join_next().await {
                log_join(result);
            }
        })
        .await;

        if finished.is_err() {
            warn!(
                pending = self.tasks.len(),
                grace_secs = grace.as_secs(),
                "Aborting forwards still running after shutdown grace"
            );
            self.tasks.shutdown().await;
        }
    }
}

fn log_join(result: Result<(), JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            error!(error = %e, "Forward task panicked");
        }
    }
}

fn received_record(envelope: &Envelope) -> AuditRecord {
    AuditRecord::WebhookReceived {
        event: envelope.event.clone(),
        id: envelope.id.clone(),
        timestamp: AuditRecord::now_timestamp(),
        size_bytes: envelope.size(),
        raw_message: envelope.raw_text(),
    }
}

/// Pull frames from `source` until it ends or `cancel` fires.
///
/// Malformed frames are reported and skipped. Forwarding runs on separate
/// tasks, at most [`Dispatcher::concurrency`] at a time, and is awaited
/// before returning.
pub async fn run_read_loop<S>(
    source: &mut S,
    dispatcher: &Dispatcher,
    cancel: &CancellationToken,
) -> SessionEnd
where
    S: EventSource + ?Sized,
{
    let mut session = SessionTasks::new(dispatcher);

    let end = loop {
        let item = tokio::select! {
            biased;
            _ = cancel.cancelled() => break SessionEnd::Cancelled,
            item = source.next_frame() => item,
        };

        match item {
            SourceItem::Ended(end) => break end,
            SourceItem::Frame(raw) => {
                if !session.handle_frame(raw, cancel).await {
                    break SessionEnd::Cancelled;
                }
            }
        }
    };

    session
        .drain(matches!(end, SessionEnd::Cancelled))
        .await;
    end
}

/// Run one session over a live connection with heartbeat and read deadline.
///
/// The heartbeat stops with the session; on cancellation it sends a normal
/// close frame first.
pub async fn run_stream_session<T>(
    connection: WebSocketStream<T>,
    dispatcher: &Dispatcher,
    settings: &SessionSettings,
    cancel: &CancellationToken,
) -> SessionEnd
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (sink, stream) = connection.split();
    let writer = ConnectionWriter::new(sink);

    let heartbeat_cancel = cancel.child_token();
    let heartbeat = tokio::spawn(run_heartbeat(
        writer,
        settings.heartbeat_interval,
        heartbeat_cancel.clone(),
    ));

    let mut source = StreamSource::new(stream, settings.read_deadline, Some(heartbeat));
    let end = run_read_loop(&mut source, dispatcher, cancel).await;

    heartbeat_cancel.cancel();
    if let Some(mut heartbeat) = source.take_heartbeat() {
        if tokio::time::timeout(CLOSE_DEADLINE * 2, &mut heartbeat)
            .await
            .is_err()
        {
            heartbeat.abort();
        }
    }

    debug!(end = ?end, "Session finished");
    end
}
