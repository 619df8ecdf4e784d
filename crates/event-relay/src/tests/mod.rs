//! Integration tests for the event relay.
//!
//! - `harness.rs`   - In-memory and TCP stream servers, HTTP receiver, recording sinks
//! - `reconnect.rs` - Dial backoff, attempt cap, reset and cancellation
//! - `session.rs`   - Read loop, close handling, read deadline, heartbeat
//! - `forwarding.rs` - Signed delivery, audit records, concurrency bound, shutdown grace
//! - `simulator.rs` - Offline mode
//! - `transport.rs` - Listener and tail listener over real sockets

mod session;
mod simulator;
