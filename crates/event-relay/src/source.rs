//! Event sources feeding a session's read loop.

use crate::{Liveness, RelayError, RelayResult};
use async_trait::async_trait;
use futures_util::stream::SplitStream;
use futures_util::StreamExt;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, trace};

/// How a session finished.
#[derive(Debug)]
pub enum SessionEnd {
    /// The peer closed the connection normally.
    ClosedNormally,
    /// Read failure, deadline expiry, abnormal close or failed heartbeat.
    TransportError(RelayError),
    /// Shutdown was requested.
    Cancelled,
}

/// One step of an event source.
#[derive(Debug)]
pub enum SourceItem {
    /// A raw data frame.
    Frame(Vec<u8>),
    /// The source is finished.
    Ended(SessionEnd),
}

/// Supplies raw frames to a session's read loop.
///
/// Cancellation is handled by the read loop, so implementations may block
/// indefinitely.
#[async_trait]
pub trait EventSource: Send {
    async fn next_frame(&mut self) -> SourceItem;
}

/// Frames read from a live stream connection.
///
/// Control frames refresh the read deadline and are not surfaced. The
/// session's heartbeat task is watched so a failed ping ends the session.
pub struct StreamSource<T> {
    reader: SplitStream<WebSocketStream<T>>,
    liveness: Liveness,
    heartbeat: Option<JoinHandle<RelayResult<()>>>,
}

impl<T> StreamSource<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(
        reader: SplitStream<WebSocketStream<T>>,
        read_deadline: Duration,
        heartbeat: Option<JoinHandle<RelayResult<()>>>,
    ) -> Self {
        Self {
            reader,
            liveness: Liveness::new(read_deadline),
            heartbeat,
        }
    }

    /// Take the heartbeat task handle if it has not finished yet.
    pub fn take_heartbeat(&mut self) -> Option<JoinHandle<RelayResult<()>>> {
        self.heartbeat.take()
    }
}

/// Map one read result to a source item; `None` for frames that are not surfaced.
fn classify(
    liveness: &mut Liveness,
    message: Option<Result<Message, tungstenite::Error>>,
) -> Option<SourceItem> {
    match message {
        Some(Ok(Message::Text(text))) => {
            liveness.touch();
            Some(SourceItem::Frame(text.as_str().as_bytes().to_vec()))
        }
        Some(Ok(Message::Binary(data))) => {
            liveness.touch();
            Some(SourceItem::Frame(data.to_vec()))
        }
        Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {
            trace!("Control frame received");
            liveness.touch();
            None
        }
        Some(Ok(Message::Close(frame))) => {
            let code = frame.as_ref().map(|f| f.code);
            debug!(code = ?code, "Close frame received");
            match code {
                None | Some(CloseCode::Normal) | Some(CloseCode::Away) => {
                    Some(SourceItem::Ended(SessionEnd::ClosedNormally))
                }
                Some(code) => Some(SourceItem::Ended(SessionEnd::TransportError(
                    RelayError::Connection(format!("connection closed with code {code}")),
                ))),
            }
        }
        Some(Err(tungstenite::Error::ConnectionClosed)) => {
            Some(SourceItem::Ended(SessionEnd::ClosedNormally))
        }
        Some(Err(e)) => Some(SourceItem::Ended(SessionEnd::TransportError(e.into()))),
        None => Some(SourceItem::Ended(SessionEnd::TransportError(
            RelayError::Connection("stream ended without close frame".to_string()),
        ))),
    }
}

#[async_trait]
impl<T> EventSource for StreamSource<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn next_frame(&mut self) -> SourceItem {
        loop {
            let deadline = self.liveness.deadline();
            let heartbeat_running = self.heartbeat.is_some();
            let heartbeat = &mut self.heartbeat;
            let reader = &mut self.reader;

            tokio::select! {
                joined = async {
                    match heartbeat.as_mut() {
                        Some(handle) => handle.await,
                        None => std::future::pending().await,
                    }
                }, if heartbeat_running => {
                    self.heartbeat = None;
                    match joined {
                        Ok(Ok(())) => continue,
                        Ok(Err(e)) => return SourceItem::Ended(SessionEnd::TransportError(e)),
                        Err(e) => {
                            return SourceItem::Ended(SessionEnd::TransportError(
                                RelayError::Heartbeat(e.to_string()),
                            ))
                        }
                    }
                }
                read = tokio::time::timeout_at(deadline, reader.next()) => {
                    let Ok(message) = read else {
                        debug!(window_secs = self.liveness.window().as_secs(), "Read deadline expired");
                        return SourceItem::Ended(SessionEnd::TransportError(RelayError::Timeout));
                    };
                    if let Some(item) = classify(&mut self.liveness, message) {
                        return item;
                    }
                }
            }
        }
    }
}
