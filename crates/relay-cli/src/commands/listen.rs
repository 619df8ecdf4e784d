use std::sync::Arc;

use anyhow::Context;
use audit_log::JsonlAuditLog;
use event_relay::{build_http_client, Listener};
use relay_config::{Config, Paths};
use tokio_util::sync::CancellationToken;
use tracing::info;
use url::Url;

use super::{finish, ListenArgs};

pub async fn run(
    config: Config,
    paths: &Paths,
    args: ListenArgs,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    config.validate()?;

    let forward_url = args
        .forward_to
        .unwrap_or_else(|| config.default_forward_url.clone());
    Url::parse(&forward_url).with_context(|| format!("invalid forward URL: {forward_url}"))?;

    // The simulator never dials, so it runs without credentials.
    let token = match args.token {
        Some(token) => token,
        None if args.mock => String::new(),
        None => anyhow::bail!("an API key is required: pass --token or set ABACATE_TOKEN"),
    };

    paths.ensure_dirs()?;
    let audit = JsonlAuditLog::open(paths.transactions_log_file())
        .context("failed to open transaction log")?;
    let client = build_http_client(&config)?;
    let mock = args.mock;

    let listener = Listener::new(config, client, forward_url, token, Arc::new(audit));

    info!(forward_url = %listener.forward_url(), mock, "Starting listener");
    if mock {
        println!("Mock mode: emitting simulated billing.paid events");
    }
    println!("Ready! Forwarding events to {}", listener.forward_url());
    println!("Signing secret: {}", listener.signing_secret());
    println!("Press Ctrl+C to stop");

    finish(listener.listen(cancel, mock).await)
}
