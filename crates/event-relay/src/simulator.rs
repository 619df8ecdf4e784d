//! Offline event simulator.

use crate::{
    run_read_loop, simulated_billing_paid, Dispatcher, EventSource, RelayError, RelayResult,
    SessionEnd, SourceItem,
};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Emits a synthetic `billing.paid` envelope every period, first one
/// period after creation.
pub struct SimulatedSource {
    ticker: Interval,
}

impl SimulatedSource {
    pub fn new(period: Duration) -> Self {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { ticker }
    }
}

#[async_trait]
impl EventSource for SimulatedSource {
    async fn next_frame(&mut self) -> SourceItem {
        self.ticker.tick().await;
        match serde_json::to_vec(&simulated_billing_paid()) {
            Ok(raw) => SourceItem::Frame(raw),
            Err(e) => SourceItem::Ended(SessionEnd::TransportError(e.into())),
        }
    }
}

/// Feed simulated events through `dispatcher` until cancelled.
///
/// No network connection is made for the stream side.
pub async fn run_mock(
    dispatcher: &Dispatcher,
    period: Duration,
    cancel: &CancellationToken,
) -> RelayResult<()> {
    info!(interval_secs = period.as_secs(), "Running in mock mode");
    let mut source = SimulatedSource::new(period);

    match run_read_loop(&mut source, dispatcher, cancel).await {
        SessionEnd::TransportError(e) => Err(e),
        SessionEnd::ClosedNormally => Ok(()),
        SessionEnd::Cancelled => Err(RelayError::Cancelled),
    }
}
