//! Subcommand implementations.

pub mod events;
pub mod listen;
pub mod tail;
pub mod verify;

use clap::{Args, Subcommand};
use event_relay::{RelayResult, SAMPLE_EVENT_KINDS};
use tracing::info;

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// URL events are forwarded to. Defaults to the configured forward URL
    #[arg(short, long)]
    pub forward_to: Option<String>,

    /// Emit simulated billing.paid events instead of connecting
    #[arg(long)]
    pub mock: bool,

    /// API key used to authenticate the stream connection
    #[arg(long, env = "ABACATE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

#[derive(Args, Debug)]
pub struct TailArgs {
    /// API key used to authenticate the stream connection
    #[arg(long, env = "ABACATE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Signing secret the payload was signed with
    #[arg(long, env = "ABACATE_SIGNING_SECRET", hide_env_values = true)]
    pub secret: String,

    /// Value of the X-Abacate-Signature header
    #[arg(long)]
    pub signature: String,

    /// Raw request body
    #[arg(long, conflicts_with = "payload_file", required_unless_present = "payload_file")]
    pub payload: Option<String>,

    /// File holding the raw request body
    #[arg(long)]
    pub payload_file: Option<std::path::PathBuf>,

    /// Reject signatures older than this many seconds
    #[arg(long)]
    pub tolerance_secs: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum EventsCommand {
    /// Print a sample payload for an event kind
    Sample {
        #[arg(value_parser = clap::builder::PossibleValuesParser::new(SAMPLE_EVENT_KINDS))]
        kind: String,
    },
}

/// A cancelled listener is a clean exit.
pub(crate) fn finish(result: RelayResult<()>) -> anyhow::Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.is_cancelled() => {
            info!("Listener stopped");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_relay::RelayError;

    #[test]
    fn cancellation_is_a_clean_exit() {
        assert!(finish(Ok(())).is_ok());
        assert!(finish(Err(RelayError::Cancelled)).is_ok());

        let err = finish(Err(RelayError::RetriesExhausted {
            url: "wss://ws.abacatepay.com/ws".into(),
            attempts: 5,
        }))
        .unwrap_err();
        assert!(err.to_string().contains("wss://ws.abacatepay.com/ws"));
    }
}
