// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Client configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is honored for local development.

use crate::services::jobs::PollConfig;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Client configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the coverage backend (no trailing slash)
    pub api_url: String,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Delay between import status checks
    pub import_poll_interval: Duration,
    /// Delay between custom-area coverage checks
    pub area_poll_interval: Duration,
    /// Overall cap on waiting for a custom-area coverage result
    pub area_poll_max_wait: Duration,
    /// Consecutive failed status checks tolerated before a job fails
    pub poll_max_failures: u32,
    /// Port of the local OAuth callback listener
    pub callback_port: u16,
    /// Where the browser starts the Strava login; `None` means the backend default
    pub oauth_login_url: Option<String>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080".to_string(),
            request_timeout: Duration::from_millis(10_000),
            import_poll_interval: Duration::from_secs(5),
            area_poll_interval: Duration::from_secs(10),
            area_poll_max_wait: Duration::from_secs(120),
            poll_max_failures: 5,
            callback_port: 3000,
            oauth_login_url: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let defaults = Self::default();

        Ok(Self {
            api_url: env::var("API_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_url),
            request_timeout: Duration::from_millis(parse_var("API_TIMEOUT_MS", 10_000u64)?),
            import_poll_interval: Duration::from_secs(parse_var("IMPORT_POLL_INTERVAL_SECS", 5u64)?),
            area_poll_interval: Duration::from_secs(parse_var("AREA_POLL_INTERVAL_SECS", 10u64)?),
            area_poll_max_wait: Duration::from_secs(parse_var("AREA_POLL_MAX_WAIT_SECS", 120u64)?),
            poll_max_failures: parse_var("POLL_MAX_FAILURES", 5u32)?,
            callback_port: parse_var("CALLBACK_PORT", 3000u16)?,
            oauth_login_url: env::var("OAUTH_LOGIN_URL").ok().filter(|v| !v.trim().is_empty()),
        })
    }

    /// Local URL the backend should redirect to after login.
    pub fn callback_url(&self) -> String {
        format!("http://localhost:{}/oauth/callback", self.callback_port)
    }

    /// Login URL to open in a browser.
    pub fn login_url(&self) -> String {
        let base = self
            .oauth_login_url
            .clone()
            .unwrap_or_else(|| format!("{}/api/auth/strava", self.api_url));
        let separator = if base.contains('?') { '&' } else { '?' };
        format!(
            "{}{}redirect_uri={}",
            base,
            separator,
            urlencoding::encode(&self.callback_url())
        )
    }

    /// Polling policy for the full activity import.
    ///
    /// The import has no deadline; it ends when the backend reports it done.
    pub fn import_polling(&self) -> PollConfig {
        PollConfig {
            interval: self.import_poll_interval,
            max_wait: None,
            max_consecutive_failures: self.poll_max_failures,
        }
    }

    /// Polling policy for a single custom-area coverage calculation.
    pub fn area_polling(&self) -> PollConfig {
        PollConfig {
            interval: self.area_poll_interval,
            max_wait: Some(self.area_poll_max_wait),
            max_consecutive_failures: self.poll_max_failures,
        }
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1:?}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("API_URL", "https://coverage.example.com/");
        env::set_var("AREA_POLL_MAX_WAIT_SECS", "90");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.api_url, "https://coverage.example.com");
        assert_eq!(config.area_poll_max_wait, Duration::from_secs(90));
        assert_eq!(config.callback_port, 3000);

        env::set_var("POLL_MAX_FAILURES", "lots");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("POLL_MAX_FAILURES", _)));

        env::remove_var("API_URL");
        env::remove_var("AREA_POLL_MAX_WAIT_SECS");
        env::remove_var("POLL_MAX_FAILURES");
    }

    #[test]
    fn test_polling_policies() {
        let config = Config::default();

        let import = config.import_polling();
        assert_eq!(import.max_wait, None);
        assert_eq!(import.interval, Duration::from_secs(5));

        let area = config.area_polling();
        assert_eq!(area.max_wait, Some(Duration::from_secs(120)));
        assert_eq!(area.max_consecutive_failures, 5);
    }

    #[test]
    fn test_login_url() {
        let config = Config::default();
        assert_eq!(
            config.login_url(),
            "http://localhost:8080/api/auth/strava?redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Foauth%2Fcallback"
        );

        let config = Config {
            oauth_login_url: Some("https://coverage.example.com/login?app=cli".to_string()),
            ..Config::default()
        };
        assert!(config.login_url().starts_with("https://coverage.example.com/login?app=cli&redirect_uri="));
    }
}
