//! Session tests over an in-memory connection, display only.

use super::harness::{close_message, event_frame, ws_pair, ws_pair_with_buffer, RecordingDisplay};
use crate::{run_stream_session, Dispatcher, RelayError, SessionEnd, SessionSettings};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

fn settings() -> SessionSettings {
    SessionSettings {
        heartbeat_interval: Duration::from_secs(30),
        read_deadline: Duration::from_secs(90),
    }
}

#[tokio::test]
async fn frames_are_displayed_in_arrival_order() {
    let (client, mut server) = ws_pair().await;
    let display = RecordingDisplay::new();
    let dispatcher = Dispatcher::tail(display.clone());
    let cancel = CancellationToken::new();

    let settings = settings();
    let (end, _server) = tokio::join!(
        run_stream_session(client, &dispatcher, &settings, &cancel),
        async {
            for id in ["pix_1", "pix_2", "pix_3"] {
                server.send(Message::text(event_frame(id))).await.unwrap();
            }
            server.send(close_message(CloseCode::Normal)).await.unwrap();
            server
        }
    );

    assert!(matches!(end, SessionEnd::ClosedNormally), "got {end:?}");
    assert_eq!(display.received_ids(), vec!["pix_1", "pix_2", "pix_3"]);
    assert!(display.forwarded_statuses().is_empty());
}

#[tokio::test]
async fn malformed_frame_warns_once_and_session_continues() {
    let (client, mut server) = ws_pair().await;
    let display = RecordingDisplay::new();
    let dispatcher = Dispatcher::tail(display.clone());
    let cancel = CancellationToken::new();

    let settings = settings();
    let (end, _server) = tokio::join!(
        run_stream_session(client, &dispatcher, &settings, &cancel),
        async {
            server.send(Message::text("not json")).await.unwrap();
            server.send(Message::text(event_frame("pix_after"))).await.unwrap();
            server.send(close_message(CloseCode::Away)).await.unwrap();
            server
        }
    );

    assert!(matches!(end, SessionEnd::ClosedNormally), "got {end:?}");
    assert_eq!(display.warning_messages().len(), 1);
    assert_eq!(display.received_ids(), vec!["pix_after"]);
}

#[tokio::test]
async fn binary_frames_are_accepted() {
    let (client, mut server) = ws_pair().await;
    let display = RecordingDisplay::new();
    let dispatcher = Dispatcher::tail(display.clone());
    let cancel = CancellationToken::new();

    let settings = settings();
    let (end, _server) = tokio::join!(
        run_stream_session(client, &dispatcher, &settings, &cancel),
        async {
            let frame = event_frame("pix_bin").into_bytes();
            server.send(Message::binary(frame)).await.unwrap();
            server.send(close_message(CloseCode::Normal)).await.unwrap();
            server
        }
    );

    assert!(matches!(end, SessionEnd::ClosedNormally));
    assert_eq!(display.received_ids(), vec!["pix_bin"]);
}

#[tokio::test]
async fn abnormal_close_code_is_transport_error() {
    let (client, mut server) = ws_pair().await;
    let dispatcher = Dispatcher::tail(RecordingDisplay::new());
    let cancel = CancellationToken::new();

    let settings = settings();
    let (end, _server) = tokio::join!(
        run_stream_session(client, &dispatcher, &settings, &cancel),
        async {
            server.send(close_message(CloseCode::Error)).await.unwrap();
            server
        }
    );

    assert!(matches!(end, SessionEnd::TransportError(_)), "got {end:?}");
}

#[tokio::test]
async fn dropped_connection_is_transport_error() {
    let (client, server) = ws_pair().await;
    let dispatcher = Dispatcher::tail(RecordingDisplay::new());
    let cancel = CancellationToken::new();
    drop(server);

    let end = run_stream_session(client, &dispatcher, &settings(), &cancel).await;

    assert!(matches!(end, SessionEnd::TransportError(_)), "got {end:?}");
}

#[tokio::test(start_paused = true)]
async fn silent_connection_ends_at_read_deadline() {
    let (client, _server) = ws_pair().await;
    let dispatcher = Dispatcher::tail(RecordingDisplay::new());
    let cancel = CancellationToken::new();

    // The server never reads, so pings go unanswered.
    let started = tokio::time::Instant::now();
    let end = run_stream_session(client, &dispatcher, &settings(), &cancel).await;

    assert!(
        matches!(end, SessionEnd::TransportError(RelayError::Timeout)),
        "got {end:?}"
    );
    assert_eq!(started.elapsed().as_secs(), 90);
}

#[tokio::test(start_paused = true)]
async fn ping_that_cannot_be_sent_ends_session() {
    // Room for one ping frame; the peer never drains the pipe.
    let (client, _server) = ws_pair_with_buffer(8).await;
    let dispatcher = Dispatcher::tail(RecordingDisplay::new());
    let cancel = CancellationToken::new();

    let started = tokio::time::Instant::now();
    let end = run_stream_session(client, &dispatcher, &settings(), &cancel).await;

    assert!(
        matches!(end, SessionEnd::TransportError(RelayError::Heartbeat(_))),
        "got {end:?}"
    );
    // Second ping blocks at 60s and times out before the read deadline.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(60), "ended after {elapsed:?}");
    assert!(elapsed < Duration::from_secs(90), "ended after {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn answered_pings_keep_session_alive_and_cancel_sends_close() {
    let (client, mut server) = ws_pair().await;
    let dispatcher = Dispatcher::tail(RecordingDisplay::new());
    let cancel = CancellationToken::new();

    let settings = settings();
    let (end, (pings, close_code), _) = tokio::join!(
        run_stream_session(client, &dispatcher, &settings, &cancel),
        async {
            // Reading lets the server answer each ping with a pong.
            let mut pings = 0;
            let mut close_code = None;
            while let Some(Ok(message)) = server.next().await {
                match message {
                    Message::Ping(_) => pings += 1,
                    Message::Close(frame) => {
                        close_code = frame.map(|frame| frame.code);
                        break;
                    }
                    _ => {}
                }
            }
            (pings, close_code)
        },
        async {
            tokio::time::sleep(Duration::from_secs(200)).await;
            cancel.cancel();
        }
    );

    // Still alive at 200s, well past the 90s deadline, until cancelled.
    assert!(matches!(end, SessionEnd::Cancelled), "got {end:?}");
    assert!(pings >= 6, "only {pings} pings");
    assert_eq!(close_code, Some(CloseCode::Normal));
}
