//! Event stream relay.
//!
//! This crate provides:
//! - A reconnect loop with exponential backoff and an optional attempt cap
//! - Per-connection sessions with a keepalive heartbeat and read deadline
//! - Bounded-concurrency forwarding of each event to a local endpoint,
//!   signed with HMAC-SHA256
//! - A read-only tail session and an offline simulator sharing the same
//!   display path
//!
//! ```text
//! Listener::listen
//!   └─ connect_with_retry ── dial ── backoff ──┐
//!        └─ run_stream_session (one per connection)
//!             ├─ heartbeat task (ping / close, single writer)
//!             └─ read loop ── display + audit ── forward tasks (≤ N)
//! ```

mod backoff;
mod connection;
mod display;
mod envelope;
mod error;
mod forwarder;
mod heartbeat;
mod listener;
mod reconnect;
mod samples;
mod session;
mod simulator;
mod source;

#[cfg(test)]
mod tests;

pub use backoff::Backoff;
pub use connection::{ConnectionWriter, Liveness};
pub use display::{ConsoleDisplay, DisplaySink};
pub use envelope::Envelope;
pub use error::{RelayError, RelayResult};
pub use forwarder::{build_http_client, DeliveryOutcome, Forwarder};
pub use heartbeat::run_heartbeat;
pub use listener::{Listener, TailListener};
pub use reconnect::{connect_with_retry, ConnectionDescriptor, Dialer, WsDialer, WsStream};
pub use samples::{sample_event, simulated_billing_paid, SAMPLE_EVENT_KINDS};
pub use session::{
    run_read_loop, run_stream_session, DispatchMode, Dispatcher, SessionSettings,
    DEFAULT_FORWARD_CONCURRENCY,
};
pub use simulator::{run_mock, SimulatedSource};
pub use source::{EventSource, SessionEnd, SourceItem, StreamSource};
