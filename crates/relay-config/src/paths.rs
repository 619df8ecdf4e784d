//! File system paths for the relay.

use crate::{ConfigError, ConfigResult};
use std::path::{Path, PathBuf};

/// Directory name under the home directory.
const BASE_DIR_NAME: &str = ".abacatepay";

/// Resolves where the relay keeps its config and logs.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory (~/.abacatepay)
    base_dir: PathBuf,
}

impl Paths {
    /// Use `~/.abacatepay` as the base directory.
    pub fn new() -> ConfigResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| ConfigError::Path("Could not determine home directory".to_string()))?;

        Ok(Self {
            base_dir: home.join(BASE_DIR_NAME),
        })
    }

    /// Use a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Get the config file path (~/.abacatepay/config.json).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the logs directory (~/.abacatepay/logs).
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// Operational log written by the tracing subscriber.
    pub fn cli_log_file(&self) -> PathBuf {
        self.logs_dir().join("cli.jsonl")
    }

    /// Audit trail of received and forwarded webhooks.
    pub fn transactions_log_file(&self) -> PathBuf {
        self.logs_dir().join("transactions.jsonl")
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> ConfigResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}
