//! AbacatePay webhook relay command-line interface.

mod commands;
mod shutdown;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use relay_config::{init_logging, parse_level, Config, Paths};
use tokio_util::sync::CancellationToken;
use tracing::Level;

use commands::{EventsCommand, ListenArgs, TailArgs, VerifyArgs};

/// Relay AbacatePay webhook events to a local endpoint.
#[derive(Parser, Debug)]
#[command(name = "abacate-relay")]
#[command(about = "Relay AbacatePay webhook events to a local endpoint")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Defaults to the config file value
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for config and logs. Defaults to ~/.abacatepay
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Use local development endpoints
    #[arg(long, global = true)]
    local: bool,

    /// Pretty-print every payload
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Forward events to a local endpoint
    Listen(ListenArgs),
    /// Show events without forwarding them
    Tail(TailArgs),
    /// Verify a signature header against a payload
    Verify(VerifyArgs),
    /// Work with sample event payloads
    Events {
        #[command(subcommand)]
        command: EventsCommand,
    },
}

fn load_config(cli: &Cli, paths: &Paths) -> anyhow::Result<Config> {
    let mut config = if cli.local {
        let mut config = Config::local();
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config
    } else {
        Config::load(paths).context("failed to load configuration")?
    };

    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if cli.verbose {
        config.verbose = true;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = match &cli.base_dir {
        Some(base) => Paths::with_base_dir(base.clone()),
        None => Paths::new()?,
    };
    let config = load_config(&cli, &paths)?;

    let level = parse_level(&config.log_level);
    init_logging(
        "abacate-relay",
        &config.log_level,
        &paths,
        level == Level::DEBUG || level == Level::TRACE,
    );

    match cli.command {
        Commands::Listen(args) => {
            let cancel = CancellationToken::new();
            shutdown::cancel_on_signal(cancel.clone());
            commands::listen::run(config, &paths, args, &cancel).await
        }
        Commands::Tail(args) => {
            let cancel = CancellationToken::new();
            shutdown::cancel_on_signal(cancel.clone());
            commands::tail::run(config, args, &cancel).await
        }
        Commands::Verify(args) => commands::verify::run(args),
        Commands::Events { command } => commands::events::run(command),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_listen_with_global_flags() {
        let cli = Cli::try_parse_from([
            "abacate-relay",
            "listen",
            "--forward-to",
            "http://localhost:4000/hooks",
            "--mock",
            "--verbose",
            "--local",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert!(cli.local);
        match cli.command {
            Commands::Listen(args) => {
                assert!(args.mock);
                assert_eq!(args.forward_to.as_deref(), Some("http://localhost:4000/hooks"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_sample_kind() {
        let result = Cli::try_parse_from(["abacate-relay", "events", "sample", "billing.refunded"]);
        assert!(result.is_err());

        let cli = Cli::try_parse_from(["abacate-relay", "events", "sample", "payout.done"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Events {
                command: EventsCommand::Sample { ref kind }
            } if kind == "payout.done"
        ));
    }

    #[test]
    fn flags_override_loaded_config() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        let cli = Cli::try_parse_from([
            "abacate-relay",
            "--log-level",
            "debug",
            "-v",
            "events",
            "sample",
            "billing.paid",
        ])
        .unwrap();

        let config = load_config(&cli, &paths).unwrap();
        assert_eq!(config.log_level, "debug");
        assert!(config.verbose);
    }
}
