//! Write side of a stream connection and its liveness deadline.

use crate::{RelayError, RelayResult};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

/// Shared handle to the write half of a connection.
///
/// Every write goes through one async mutex so a ping and a close can never
/// interleave on the wire.
pub struct ConnectionWriter<T> {
    sink: Arc<Mutex<SplitSink<WebSocketStream<T>, Message>>>,
}

impl<T> Clone for ConnectionWriter<T> {
    fn clone(&self) -> Self {
        Self {
            sink: self.sink.clone(),
        }
    }
}

impl<T> ConnectionWriter<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(sink: SplitSink<WebSocketStream<T>, Message>) -> Self {
        Self {
            sink: Arc::new(Mutex::new(sink)),
        }
    }

    /// Send a keepalive probe, bounded by `timeout` including lock wait.
    pub async fn ping(&self, timeout: Duration) -> RelayResult<()> {
        self.send_within(Message::Ping(Default::default()), timeout).await
    }

    /// Start the close handshake with a normal-closure frame.
    pub async fn close(&self, deadline: Duration) -> RelayResult<()> {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "".into(),
        };
        self.send_within(Message::Close(Some(frame)), deadline).await
    }

    async fn send_within(&self, message: Message, limit: Duration) -> RelayResult<()> {
        tokio::time::timeout(limit, async {
            let mut sink = self.sink.lock().await;
            sink.send(message).await
        })
        .await
        .map_err(|_| RelayError::Timeout)??;
        Ok(())
    }
}

/// Read deadline that slides forward on every sign of life.
#[derive(Debug, Clone)]
pub struct Liveness {
    window: Duration,
    deadline: Instant,
}

impl Liveness {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: Instant::now() + window,
        }
    }

    /// Push the deadline to `window` from now.
    pub fn touch(&mut self) {
        self.deadline = Instant::now() + self.window;
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn liveness_slides_on_touch() {
        let mut liveness = Liveness::new(Duration::from_secs(90));
        let first = liveness.deadline();

        tokio::time::advance(Duration::from_secs(30)).await;
        liveness.touch();

        assert_eq!(liveness.deadline() - first, Duration::from_secs(30));
        assert_eq!(liveness.window(), Duration::from_secs(90));
    }
}
