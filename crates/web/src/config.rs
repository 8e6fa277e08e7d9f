//! Server configuration.
//!
//! Defaults suit local development, each value can be overridden from the
//! environment:
//!
//! | variable                       | meaning                                  | default          |
//! |--------------------------------|------------------------------------------|------------------|
//! | `AQUARIUS_ADDR`                | address to listen on                     | `127.0.0.1:8080` |
//! | `AQUARIUS_MALFORMED`           | `discard` or `close` on malformed input  | `discard`        |
//! | `AQUARIUS_IDLE_TIMEOUT_SECS`   | idle connection timeout, `0` disables it | disabled         |
//! | `AQUARIUS_SHUTDOWN_GRACE_SECS` | time given to connections on shutdown    | `5`              |

use std::env;
use std::time::Duration;

use aquarius_http::codec::MalformedPolicy;
use aquarius_http::connection::ConnectionOptions;
use thiserror::Error;

pub const ADDR_VAR: &str = "AQUARIUS_ADDR";
pub const MALFORMED_VAR: &str = "AQUARIUS_MALFORMED";
pub const IDLE_TIMEOUT_VAR: &str = "AQUARIUS_IDLE_TIMEOUT_SECS";
pub const SHUTDOWN_GRACE_VAR: &str = "AQUARIUS_SHUTDOWN_GRACE_SECS";

const DEFAULT_ADDRESS: &str = "127.0.0.1:8080";
const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue { key: &'static str, value: String, reason: String },
}

impl ConfigError {
    fn invalid_value<S: ToString>(key: &'static str, value: &str, reason: S) -> Self {
        Self::InvalidValue { key, value: value.to_string(), reason: reason.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    address: String,
    connection: ConnectionOptions,
    shutdown_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            connection: ConnectionOptions::default(),
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

impl ServerConfig {
    /// Builds a configuration from the defaults and the `AQUARIUS_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from the defaults and whatever `lookup` returns for each variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(address) = lookup(ADDR_VAR) {
            config.address = address;
        }

        if let Some(value) = lookup(MALFORMED_VAR) {
            config.connection.malformed = match value.trim().to_ascii_lowercase().as_str() {
                "discard" => MalformedPolicy::Discard,
                "close" => MalformedPolicy::Close,
                _ => return Err(ConfigError::invalid_value(MALFORMED_VAR, &value, "expected `discard` or `close`")),
            };
        }

        if let Some(value) = lookup(IDLE_TIMEOUT_VAR) {
            let secs = parse_secs(IDLE_TIMEOUT_VAR, &value)?;
            config.connection.idle_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        if let Some(value) = lookup(SHUTDOWN_GRACE_VAR) {
            config.shutdown_grace = Duration::from_secs(parse_secs(SHUTDOWN_GRACE_VAR, &value)?);
        }

        Ok(config)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn connection_options(&self) -> ConnectionOptions {
        self.connection
    }

    pub fn malformed_policy(&self) -> MalformedPolicy {
        self.connection.malformed
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.connection.idle_timeout
    }

    pub fn shutdown_grace(&self) -> Duration {
        self.shutdown_grace
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn with_malformed_policy(mut self, policy: MalformedPolicy) -> Self {
        self.connection.malformed = policy;
        self
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.connection.idle_timeout = idle_timeout;
        self
    }

    pub fn with_shutdown_grace(mut self, shutdown_grace: Duration) -> Self {
        self.shutdown_grace = shutdown_grace;
        self
    }

    pub fn with_read_capacity(mut self, read_capacity: usize) -> Self {
        self.connection.read_capacity = read_capacity;
        self
    }
}

fn parse_secs(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|e| ConfigError::invalid_value(key, value, e))
}
