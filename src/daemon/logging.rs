use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Environment variable overriding the configured verbosity.
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Warnings and errors only
    #[serde(alias = "silent")]
    Quiet,
    #[default]
    #[serde(alias = "info")]
    Normal,
    #[serde(alias = "debug")]
    Verbose,
}

impl LogLevel {
    pub fn filter(self) -> LevelFilter {
        match self {
            LogLevel::Quiet => LevelFilter::Warn,
            LogLevel::Normal => LevelFilter::Info,
            LogLevel::Verbose => LevelFilter::Debug,
        }
    }

    pub fn is_quiet(self) -> bool {
        self == LogLevel::Quiet
    }

    /// `LOG_LEVEL` wins over the configured level when it parses.
    pub fn effective(configured: LogLevel) -> LogLevel {
        std::env::var(LOG_LEVEL_ENV)
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(configured)
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quiet" | "silent" => Ok(LogLevel::Quiet),
            "normal" | "info" => Ok(LogLevel::Normal),
            "verbose" | "debug" => Ok(LogLevel::Verbose),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

/// Install the global logger. Call once, from the binary.
pub fn init(level: LogLevel) -> Result<(), log::SetLoggerError> {
    env_logger::Builder::new()
        .filter_level(level.filter())
        .format_timestamp_millis()
        .try_init()
}
