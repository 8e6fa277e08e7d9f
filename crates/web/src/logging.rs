//! Process-wide logging setup.
//!
//! Installs a `tracing-subscriber` fmt subscriber. The detailed format carries the
//! timestamp, level, target, file and line of every event, the simple format only
//! the timestamp and the message.
//!
//! ```no_run
//! use aquarius::logging::{LogFormat, LogSettings};
//! use tracing::Level;
//!
//! LogSettings::new(Level::INFO).with_format(LogFormat::Simple).init().unwrap();
//! ```

use thiserror::Error;
use tracing::Level;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// `timestamp level target: file:line: message`
    #[default]
    Detailed,
    /// `timestamp message`
    Simple,
}

#[derive(Error, Debug)]
pub enum LogError {
    #[error("can't install the log subscriber: {reason}")]
    Install { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSettings {
    level: Level,
    format: LogFormat,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self { level: Level::DEBUG, format: LogFormat::Detailed }
    }
}

impl LogSettings {
    pub fn new(level: Level) -> Self {
        Self { level, ..Default::default() }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn format(&self) -> LogFormat {
        self.format
    }

    /// Installs the global subscriber.
    ///
    /// Fails if a global subscriber is already installed.
    pub fn init(&self) -> Result<(), LogError> {
        let builder = tracing_subscriber::fmt().with_max_level(self.level);

        let result = match self.format {
            LogFormat::Detailed => builder.with_target(true).with_file(true).with_line_number(true).try_init(),
            LogFormat::Simple => builder.with_target(false).with_level(false).try_init(),
        };

        result.map_err(|e| LogError::Install { reason: e.to_string() })
    }
}
