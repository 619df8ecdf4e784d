//! Configuration for the webhook relay.

use crate::{ConfigError, ConfigResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Production event stream endpoint.
pub const DEFAULT_WEBSOCKET_URL: &str = "wss://ws.abacatepay.com/ws";

/// Local endpoint events are forwarded to when none is given.
pub const DEFAULT_FORWARD_URL: &str = "http://localhost:3000/webhooks";

const LOCAL_WEBSOCKET_URL: &str = "ws://localhost:8080/ws";

/// Relay configuration.
///
/// Constructed once per process and handed to the listeners explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Pretty-print received payloads on the console.
    pub verbose: bool,
    /// Event stream (websocket) URL.
    pub websocket_url: String,
    /// Forward target used when the caller gives none.
    pub default_forward_url: String,
    /// Timeout for outbound HTTP requests and for dialing, in seconds.
    pub http_timeout_secs: u64,
    /// Reconnect backoff floor in milliseconds.
    pub min_backoff_ms: u64,
    /// Reconnect backoff ceiling in milliseconds.
    pub max_backoff_ms: u64,
    /// Consecutive dial failures before giving up. 0 retries forever.
    pub max_retries: u32,
    /// Interval between keepalive pings, in seconds.
    pub heartbeat_interval_secs: u64,
    /// Connection is considered dead after this long without traffic.
    pub read_deadline_secs: u64,
    /// Forward tasks allowed in flight per session.
    pub forward_concurrency: usize,
    /// Time in-flight forwards get to finish on shutdown, in seconds.
    pub shutdown_grace_secs: u64,
    /// Interval between synthetic events in mock mode, in seconds.
    pub mock_interval_secs: u64,
    /// Secret used to sign forwarded payloads. Generated per run if unset.
    pub signing_secret: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            verbose: false,
            websocket_url: DEFAULT_WEBSOCKET_URL.to_string(),
            default_forward_url: DEFAULT_FORWARD_URL.to_string(),
            http_timeout_secs: 10,
            min_backoff_ms: 1_000,
            max_backoff_ms: 15_000,
            max_retries: 5,
            heartbeat_interval_secs: 30,
            read_deadline_secs: 90,
            forward_concurrency: 10,
            shutdown_grace_secs: 5,
            mock_interval_secs: 5,
            signing_secret: None,
        }
    }
}

impl Config {
    /// Defaults overridden from the process environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Configuration pointing at a locally running event source.
    pub fn local() -> Self {
        Self {
            websocket_url: LOCAL_WEBSOCKET_URL.to_string(),
            ..Self::default()
        }
    }

    /// Load from the config file if present, then apply env overrides.
    pub fn load(paths: &Paths) -> ConfigResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Apply `ABACATE_*` overrides using `lookup` to read variables.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(level) = lookup("ABACATE_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(url) = lookup("ABACATE_WS_URL") {
            self.websocket_url = url;
        }
        if let Some(verbose) = lookup("ABACATE_VERBOSE") {
            self.verbose = matches!(
                verbose.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        if let Some(secret) = lookup("ABACATE_SIGNING_SECRET") {
            self.signing_secret = Some(secret);
        }
    }

    /// Reject values the relay cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        self.websocket_url()?;
        if self.min_backoff_ms == 0 {
            return Err(ConfigError::Invalid("min_backoff_ms must be positive".into()));
        }
        if self.max_backoff_ms < self.min_backoff_ms {
            return Err(ConfigError::Invalid(format!(
                "max_backoff_ms ({}) is below min_backoff_ms ({})",
                self.max_backoff_ms, self.min_backoff_ms
            )));
        }
        if self.forward_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "forward_concurrency must be at least 1".into(),
            ));
        }
        if self.heartbeat_interval_secs == 0 || self.read_deadline_secs == 0 {
            return Err(ConfigError::Invalid(
                "heartbeat and read deadline intervals must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Parsed event stream URL.
    pub fn websocket_url(&self) -> ConfigResult<Url> {
        let url = Url::parse(&self.websocket_url)?;
        match url.scheme() {
            "ws" | "wss" => Ok(url),
            other => Err(ConfigError::Invalid(format!(
                "websocket_url must use ws or wss, got {other}"
            ))),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn min_backoff(&self) -> Duration {
        Duration::from_millis(self.min_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn read_deadline(&self) -> Duration {
        Duration::from_secs(self.read_deadline_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn mock_interval(&self) -> Duration {
        Duration::from_secs(self.mock_interval_secs)
    }
}
