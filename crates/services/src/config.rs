use std::time::Duration;

use crate::error::ConfigError;
use crate::sync::{DEFAULT_DEBOUNCE, RemoteConfig};

pub const DEFAULT_DB_URL: &str = "sqlite:quiz.sqlite3";

/// Runtime configuration read from `QUIZ_*` environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_url: String,
    /// `None` keeps the app local-only.
    pub sync: Option<RemoteConfig>,
    pub debounce: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_url: DEFAULT_DB_URL.to_owned(),
            sync: None,
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

impl AppConfig {
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidNumber` if `QUIZ_SYNC_DEBOUNCE_MS` is not
    /// a non-negative integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] with an injectable variable source.
    ///
    /// # Errors
    ///
    /// See [`Self::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let db_url = lookup("QUIZ_DB_URL")
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_DB_URL.to_owned());

        let debounce =
            millis(&lookup, "QUIZ_SYNC_DEBOUNCE_MS")?.unwrap_or(DEFAULT_DEBOUNCE);
        let timeout = millis(&lookup, "QUIZ_SYNC_TIMEOUT_MS")?;

        let sync = RemoteConfig::from_lookup(&lookup).map(|remote| match timeout {
            Some(timeout) => remote.with_timeout(timeout),
            None => remote,
        });

        Ok(Self {
            db_url,
            sync,
            debounce,
        })
    }
}

/// A blank or unset variable is `None`.
fn millis(
    lookup: impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<Duration>, ConfigError> {
    let Some(raw) = lookup(var).filter(|v| !v.trim().is_empty()) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u64>()
        .map(|ms| Some(Duration::from_millis(ms)))
        .map_err(|_| ConfigError::InvalidNumber { var, raw })
}
