//! Client settings loaded from defaults, TOML or the environment.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Errors produced while loading [`ClientSettings`].
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The TOML document could not be parsed.
    #[error("invalid settings document: {0}")]
    Toml(#[from] toml::de::Error),
    /// An environment variable held a value of the wrong type.
    #[error("invalid value {value:?} for {name}")]
    InvalidEnv {
        /// Variable name.
        name: &'static str,
        /// Raw value found.
        value: String,
    },
}

/// Settings shared by every request an [`HttpClient`](crate::http::HttpClient) makes.
///
/// Durations are stored in milliseconds so the struct maps one-to-one onto a
/// flat TOML table:
///
/// ```toml
/// base_api = "https://admin.example.com/api"
/// token_name = "token"
/// timeout_ms = 5000
/// retry = 3
/// retry_delay_ms = 1000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Prefix joined onto every relative request path.
    pub base_api: String,
    /// Session key the auth token is stored under.
    pub token_name: String,
    /// Watchdog window for `request` and transport timeout for `retry_request`.
    pub timeout_ms: u64,
    /// Retries after a timeout.
    pub retry: u32,
    /// Pause before each retry.
    pub retry_delay_ms: u64,
    /// Watchdog window for downloads.
    pub download_timeout_ms: u64,
    /// Cancel a pending request when a new one is sent on the same route.
    pub cancel_duplicates: bool,
}

pub(crate) const ENV_BASE_API: &str = "EASYCRUD_BASE_API";
pub(crate) const ENV_TOKEN_NAME: &str = "EASYCRUD_TOKEN_NAME";
pub(crate) const ENV_TIMEOUT_MS: &str = "EASYCRUD_TIMEOUT_MS";
pub(crate) const ENV_RETRY: &str = "EASYCRUD_RETRY";
pub(crate) const ENV_RETRY_DELAY_MS: &str = "EASYCRUD_RETRY_DELAY_MS";

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_api: String::new(),
            token_name: "token".to_string(),
            timeout_ms: 5_000,
            retry: 3,
            retry_delay_ms: 1_000,
            download_timeout_ms: 60_000,
            cancel_duplicates: true,
        }
    }
}

impl ClientSettings {
    /// Parse settings from a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(source)?)
    }

    /// Read settings from `EASYCRUD_*` environment variables over the defaults.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) but with a custom variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        if let Some(base) = lookup(ENV_BASE_API) {
            settings.base_api = base;
        }
        if let Some(name) = lookup(ENV_TOKEN_NAME) {
            settings.token_name = name;
        }
        if let Some(value) = lookup(ENV_TIMEOUT_MS) {
            settings.timeout_ms = parse_env(ENV_TIMEOUT_MS, value)?;
        }
        if let Some(value) = lookup(ENV_RETRY) {
            settings.retry = parse_env(ENV_RETRY, value)?;
        }
        if let Some(value) = lookup(ENV_RETRY_DELAY_MS) {
            settings.retry_delay_ms = parse_env(ENV_RETRY_DELAY_MS, value)?;
        }
        Ok(settings)
    }

    /// Watchdog/transport timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Retry delay as a `Duration`.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Download watchdog window as a `Duration`.
    pub fn download_timeout(&self) -> Duration {
        Duration::from_millis(self.download_timeout_ms)
    }
}

fn parse_env<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, SettingsError> {
    value
        .trim()
        .parse()
        .map_err(|_| SettingsError::InvalidEnv { name, value })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ClientSettings::default();
        assert_eq!(settings.timeout(), Duration::from_secs(5));
        assert_eq!(settings.retry, 3);
        assert_eq!(settings.retry_delay(), Duration::from_secs(1));
        assert_eq!(settings.download_timeout(), Duration::from_secs(60));
        assert!(settings.cancel_duplicates);
    }

    #[test]
    fn test_from_toml_keeps_missing_defaults() {
        let settings = ClientSettings::from_toml_str(
            r#"
            base_api = "http://localhost:8080/api"
            retry = 1
            "#,
        )
        .unwrap();
        assert_eq!(settings.base_api, "http://localhost:8080/api");
        assert_eq!(settings.retry, 1);
        assert_eq!(settings.timeout_ms, 5_000);
        assert_eq!(settings.token_name, "token");
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (ENV_BASE_API, "https://admin.example.com"),
            (ENV_TOKEN_NAME, "adminToken"),
            (ENV_TIMEOUT_MS, "2500"),
        ]
        .into_iter()
        .collect();
        let settings =
            ClientSettings::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap();
        assert_eq!(settings.base_api, "https://admin.example.com");
        assert_eq!(settings.token_name, "adminToken");
        assert_eq!(settings.timeout(), Duration::from_millis(2500));
        assert_eq!(settings.retry, 3);
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let err = ClientSettings::from_lookup(|name| {
            (name == ENV_RETRY).then(|| "three".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, SettingsError::InvalidEnv { name: ENV_RETRY, .. }));
    }
}
