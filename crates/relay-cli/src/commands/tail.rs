use std::sync::Arc;

use anyhow::Context;
use event_relay::{ConsoleDisplay, TailListener};
use relay_config::Config;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{finish, TailArgs};

pub async fn run(config: Config, args: TailArgs, cancel: &CancellationToken) -> anyhow::Result<()> {
    config.validate()?;
    let token = args
        .token
        .context("an API key is required: pass --token or set ABACATE_TOKEN")?;

    let display = Arc::new(ConsoleDisplay::new(config.verbose));
    let tail = TailListener::new(config, token, display);

    info!("Tailing events");
    println!("Tailing events. Press Ctrl+C to stop");

    finish(tail.listen(cancel).await)
}
