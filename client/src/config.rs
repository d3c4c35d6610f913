//! Client configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SESSION_FILE_NAME: &str = ".gotux-session.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Timeouts {
    #[must_use]
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    #[must_use]
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend API root, without a trailing slash (e.g. `http://host/api`).
    pub base_url: String,
    pub timeouts: Timeouts,
    /// Where the CLI mirrors the session between invocations.
    pub session_file: PathBuf,
}

impl ClientConfig {
    /// Build a config for `base_url` with default timeouts and session file.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an http(s) URL.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            timeouts: Timeouts::default(),
            session_file: default_session_file(std::env::var("HOME").ok().as_deref()),
        })
    }

    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `GOTUX_BASE_URL`: default `http://127.0.0.1:8080/api`
    /// - `GOTUX_REQUEST_TIMEOUT_SECS`: default 30
    /// - `GOTUX_CONNECT_TIMEOUT_SECS`: default 10
    /// - `GOTUX_SESSION_FILE`: default `$HOME/.gotux/session.json`
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is present but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`], reading through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is present but malformed.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = normalize_base_url(&lookup("GOTUX_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()))?;
        let timeouts = Timeouts {
            request_secs: parse_secs(&lookup, "GOTUX_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
            connect_secs: parse_secs(&lookup, "GOTUX_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)?,
        };
        let session_file = lookup("GOTUX_SESSION_FILE")
            .filter(|raw| !raw.trim().is_empty())
            .map_or_else(|| default_session_file(lookup("HOME").as_deref()), PathBuf::from);

        Ok(Self { base_url, timeouts, session_file })
    }

    /// Absolute URL for an API path such as `/images/7`.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }
}

pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    if path.starts_with('/') {
        format!("{base_url}{path}")
    } else {
        format!("{base_url}/{path}")
    }
}

/// Validate and trim a base URL.
///
/// # Errors
///
/// Returns an error if the URL is not http(s).
pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidBaseUrl(raw.to_owned()));
    }
    Ok(trimmed.trim_end_matches('/').to_owned())
}

fn parse_secs<F>(lookup: &F, key: &str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(ConfigError::InvalidNumber { var: key.to_owned(), value: raw }),
    }
}

fn default_session_file(home: Option<&str>) -> PathBuf {
    match home.filter(|h| !h.is_empty()) {
        Some(home) => PathBuf::from(home).join(".gotux").join("session.json"),
        None => PathBuf::from(DEFAULT_SESSION_FILE_NAME),
    }
}
