//! Configuration, file system paths and logging setup for the webhook relay.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{Config, DEFAULT_FORWARD_URL, DEFAULT_LOG_LEVEL, DEFAULT_WEBSOCKET_URL};
pub use error::{ConfigError, ConfigResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;
