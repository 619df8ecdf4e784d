//! # Observability
//!
//! Logging setup shared by every crate in the relay workspace.
//!
//! Crates only ever use `tracing` macros. The binary calls [`init_with_config`]
//! once at startup, which installs:
//!
//! - a JSONL file layer (one object per line, append-only) at
//!   `~/.abacatepay/logs/cli.jsonl` unless another path is given;
//! - an optional compact stderr layer for foreground use.
//!
//! Both layers honour `RUST_LOG`, falling back to [`LogConfig::default_level`].
//! Fields whose names look like credentials (`token`, `secret`,
//! `authorization`, ...) are redacted before they reach the file.
//!
//! ```rust,ignore
//! observability::init_with_config(observability::LogConfig {
//!     service_name: "abacate-relay".into(),
//!     default_level: "debug".into(),
//!     also_stderr: true,
//!     ..Default::default()
//! });
//! tracing::info!("ready");
//! ```

mod file;
mod json_layer;
mod redact;

use std::path::PathBuf;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub use file::LogFileWriter;
pub use json_layer::{JsonLayer, LogEntry};
pub use redact::is_sensitive_key;

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name written into every log line.
    pub service_name: String,

    /// Default filter when `RUST_LOG` is unset (e.g. "info", "debug").
    pub default_level: String,

    /// Log file path. Defaults to `~/.abacatepay/logs/cli.jsonl`.
    pub log_path: Option<PathBuf>,

    /// Also emit human-readable logs to stderr.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
        }
    }
}

/// Default location of the operational log file.
pub fn default_log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".abacatepay").join("logs").join("cli.jsonl"))
}

/// Initialize logging with default settings for `service_name`.
pub fn init(service_name: &str) {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    });
}

/// Initialize logging with a custom configuration.
///
/// If the log file cannot be opened, logging continues on stderr only and a
/// warning is emitted once the subscriber is installed.
pub fn init_with_config(config: LogConfig) {
    let log_path = config.log_path.clone().or_else(default_log_path);

    let (file_layer, open_error) = match log_path.as_ref().map(LogFileWriter::open) {
        Some(Ok(writer)) => (
            Some(
                JsonLayer::new(config.service_name.clone(), writer)
                    .with_filter(env_filter(&config.default_level)),
            ),
            None,
        ),
        Some(Err(e)) => (None, Some(e.to_string())),
        None => (None, Some("home directory not found".to_string())),
    };

    // Without a file the stderr layer is the only sink left, so force it on.
    let stderr_layer = if config.also_stderr || file_layer.is_none() {
        Some(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .compact()
                .with_writer(std::io::stderr)
                .with_filter(env_filter(&config.default_level)),
        )
    } else {
        None
    };

    let installed = tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .is_ok();

    if !installed {
        return;
    }

    match (open_error, log_path) {
        (Some(error), path) => tracing::warn!(
            path = ?path,
            error = %error,
            "log file unavailable, logging to stderr only"
        ),
        (None, Some(path)) => tracing::debug!(
            log_path = %path.display(),
            service = %config.service_name,
            "observability initialized"
        ),
        (None, None) => {}
    }
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, trace, warn, Level};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.service_name, "unknown");
        assert_eq!(config.default_level, "info");
        assert!(config.log_path.is_none());
        assert!(!config.also_stderr);
    }

    #[test]
    fn test_default_log_path_under_abacatepay_dir() {
        if let Some(path) = default_log_path() {
            assert!(path.ends_with(".abacatepay/logs/cli.jsonl"));
        }
    }
}
