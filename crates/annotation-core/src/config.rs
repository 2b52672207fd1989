//! Session configuration
//!
//! Settings can be built programmatically or read from environment variables:
//! - `INKPAPER_DEBOUNCE_MS`: minimum gap between recorded ink updates (default: 100)
//! - `INKPAPER_HISTORY_LIMIT`: undo entries kept per document (default: 20)

use crate::history::DEFAULT_HISTORY_LIMIT;
use std::time::Duration;

/// Default minimum gap between two recorded updates of the same document
pub const DEFAULT_DEBOUNCE_INTERVAL: Duration = Duration::from_millis(100);

pub const DEBOUNCE_ENV: &str = "INKPAPER_DEBOUNCE_MS";
pub const HISTORY_LIMIT_ENV: &str = "INKPAPER_HISTORY_LIMIT";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

/// Tuning for the update gate and per-document history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Updates arriving sooner than this after the last accepted one are dropped
    pub debounce_interval: Duration,

    /// Undo entries kept per document
    pub history_limit: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { debounce_interval: DEFAULT_DEBOUNCE_INTERVAL, history_limit: DEFAULT_HISTORY_LIMIT }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_debounce_interval(mut self, interval: Duration) -> Self {
        self.debounce_interval = interval;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Defaults overridden by any of the `INKPAPER_*` variables that are set
    ///
    /// # Errors
    /// Returns an error if a variable is set but does not parse as a
    /// non-negative integer (history limit must be at least 1).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup(DEBOUNCE_ENV) {
            let millis = value
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue { name: DEBOUNCE_ENV, value: value.clone() })?;
            config.debounce_interval = Duration::from_millis(millis);
        }

        if let Some(value) = lookup(HISTORY_LIMIT_ENV) {
            let limit = value
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|limit| *limit > 0)
                .ok_or_else(|| ConfigError::InvalidValue {
                    name: HISTORY_LIMIT_ENV,
                    value: value.clone(),
                })?;
            config.history_limit = limit;
        }

        Ok(config)
    }
}
