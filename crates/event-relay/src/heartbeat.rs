//! Keepalive pings for a live connection.

use crate::{ConnectionWriter, RelayError, RelayResult};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Bound on sending one ping.
pub(crate) const PING_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Bound on sending the close frame during shutdown.
pub(crate) const CLOSE_DEADLINE: Duration = Duration::from_secs(1);

/// Ping every `interval` until `cancel` fires or a ping cannot be sent.
///
/// On cancellation a normal close frame is attempted and `Ok(())` returned.
/// A failed ping returns [`RelayError::Heartbeat`] so the session can be
/// torn down.
pub async fn run_heartbeat<T>(
    writer: ConnectionWriter<T>,
    interval: Duration,
    cancel: CancellationToken,
) -> RelayResult<()>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                if let Err(e) = writer.close(CLOSE_DEADLINE).await {
                    debug!(error = %e, "Close handshake not sent");
                }
                return Ok(());
            }
            _ = ticker.tick() => {
                if let Err(e) = writer.ping(PING_SEND_TIMEOUT).await {
                    debug!(error = %e, "Ping failed");
                    return Err(RelayError::Heartbeat(e.to_string()));
                }
                trace!("Ping sent");
            }
        }
    }
}
