//! Offline simulator tests.

use super::harness::{test_config, wait_until, MockReceiver, RecordingDisplay, TEST_SECRET};
use crate::{run_mock, Dispatcher, Listener};
use audit_log::MemoryAuditSink;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use webhook_signing::verify_header;

#[tokio::test(start_paused = true)]
async fn emits_one_event_per_period() {
    let display = RecordingDisplay::new();
    let dispatcher = Dispatcher::tail(display.clone());
    let cancel = CancellationToken::new();

    let (result, _) = tokio::join!(
        run_mock(&dispatcher, Duration::from_secs(5), &cancel),
        async {
            tokio::time::sleep(Duration::from_millis(4900)).await;
            assert!(display.received_events().is_empty());

            tokio::time::sleep(Duration::from_millis(200)).await;
            assert_eq!(display.received_events().len(), 1);

            tokio::time::sleep(Duration::from_secs(5)).await;
            assert_eq!(display.received_events().len(), 2);
            cancel.cancel();
        }
    );

    assert!(result.unwrap_err().is_cancelled());
    for (event, id) in display.received_events() {
        assert_eq!(event, "billing.paid");
        assert!(id.unwrap().starts_with("pix_char_"));
    }
}

#[tokio::test]
async fn mock_listener_forwards_without_dialing() {
    let receiver = MockReceiver::start(200).await;
    let audit = Arc::new(MemoryAuditSink::new());
    let display = RecordingDisplay::new();

    // Nothing listens here; mock mode must never dial it.
    let mut config = test_config("ws://127.0.0.1:9/ws");
    config.mock_interval_secs = 1;

    let listener = Listener::new(
        config,
        reqwest::Client::new(),
        receiver.url(),
        "unused-token",
        audit.clone(),
    )
    .with_display(display.clone());
    let cancel = CancellationToken::new();

    let (result, _) = tokio::join!(listener.listen(&cancel, true), async {
        assert!(wait_until(Duration::from_secs(5), || !audit.of_kind("webhook_forwarded").is_empty()).await);
        cancel.cancel();
    });

    assert!(result.unwrap_err().is_cancelled());

    let request = &receiver.requests()[0];
    let header = request.signature.as_deref().unwrap();
    let now = chrono::Utc::now().timestamp();
    verify_header(TEST_SECRET, header, &request.body, None, now).unwrap();

    let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
    assert_eq!(body["event"], "billing.paid");
    assert_eq!(body["data"]["status"], "PAID");
    assert!(!audit.of_kind("webhook_received").is_empty());
    assert!(!display.forwarded_statuses().is_empty());
}
