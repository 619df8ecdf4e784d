//! Human-facing output for received and forwarded events.

use crate::Envelope;
use chrono::Local;
use reqwest::StatusCode;

/// Where session activity is shown to the developer.
///
/// Calls come from the read loop and from forward tasks concurrently.
pub trait DisplaySink: Send + Sync {
    /// An envelope arrived.
    fn received(&self, envelope: &Envelope);

    /// The local endpoint answered `status` for `event`.
    fn forwarded(&self, event: &str, status: u16);

    /// A non-fatal problem worth showing.
    fn warning(&self, message: &str);
}

/// Terminal output. Verbose mode pretty-prints each payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleDisplay {
    verbose: bool,
}

impl ConsoleDisplay {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    fn timestamp() -> String {
        Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

impl DisplaySink for ConsoleDisplay {
    fn received(&self, envelope: &Envelope) {
        let id = envelope.id.as_deref().unwrap_or("-");
        println!("{}  --> {} [{}]", Self::timestamp(), envelope.event, id);

        if self.verbose {
            println!("{}", pretty_payload(envelope.raw()));
        }
    }

    fn forwarded(&self, event: &str, status: u16) {
        println!(
            "{}  <-- [{}] {}",
            Self::timestamp(),
            status_label(status),
            event
        );
    }

    fn warning(&self, message: &str) {
        eprintln!("{}  !!  {}", Self::timestamp(), message);
    }
}

/// `"200 OK"`, or just the number when the reason is unknown.
pub(crate) fn status_label(status: u16) -> String {
    match StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
    {
        Some(reason) => format!("{status} {reason}"),
        None => status.to_string(),
    }
}

/// Indented JSON, or the raw text when the payload is not JSON.
pub(crate) fn pretty_payload(raw: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(raw)
        .and_then(|value| serde_json::to_string_pretty(&value))
        .unwrap_or_else(|_| String::from_utf8_lossy(raw).into_owned())
}
