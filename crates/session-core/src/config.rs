use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::config_env::{EnvLookup, optional_trimmed_env, parse_enum_env, parse_u64_env, process_env};

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";

const API_BASE_URL_VAR: &str = "ASK_API_BASE_URL";
const HTTP_TIMEOUT_MS_VAR: &str = "ASK_HTTP_TIMEOUT_MS";
const STALE_RESPONSES_VAR: &str = "ASK_STALE_RESPONSES";

/// What to do with a query answer that resolves after the session it was
/// asked against has been replaced by a newer ingestion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StaleResponsePolicy {
    #[default]
    Discard,
    Apply,
}

impl StaleResponsePolicy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Discard => "discard",
            Self::Apply => "apply",
        }
    }
}

impl fmt::Display for StaleResponsePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StaleResponsePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "discard" => Ok(Self::Discard),
            "apply" => Ok(Self::Apply),
            other => Err(format!("unsupported stale response policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub http_timeout_ms: u64,
    pub stale_responses: StaleResponsePolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            http_timeout_ms: 0,
            stale_responses: StaleResponsePolicy::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid integer in env var {key}: {value}")]
    ParseInt { key: String, value: String },
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("failed to load .env file: {0}")]
    Dotenv(String),
    #[error("failed to build http client: {0}")]
    HttpClient(String),
}

/// Loads `.env` from the working directory if one exists. A missing file is
/// not an error.
pub fn load_dotenv() -> Result<(), ConfigError> {
    match dotenvy::dotenv() {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(ConfigError::Dotenv(err.to_string())),
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&process_env)
    }

    pub(crate) fn from_lookup(lookup: EnvLookup<'_>) -> Result<Self, ConfigError> {
        let api_base_url = match optional_trimmed_env(lookup, API_BASE_URL_VAR) {
            Some(raw) => normalize_base_url(&raw)?,
            None => DEFAULT_API_BASE_URL.to_string(),
        };

        Ok(Self {
            api_base_url,
            http_timeout_ms: parse_u64_env(lookup, HTTP_TIMEOUT_MS_VAR, 0)?,
            stale_responses: parse_enum_env(lookup, STALE_RESPONSES_VAR)?,
        })
    }

    /// `None` when no timeout is configured; requests then wait for the
    /// transport to resolve.
    pub fn http_timeout(&self) -> Option<Duration> {
        (self.http_timeout_ms > 0).then(|| Duration::from_millis(self.http_timeout_ms))
    }

    pub fn build_http_client(&self) -> Result<reqwest::Client, ConfigError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.http_timeout() {
            builder = builder.timeout(timeout);
        }
        builder
            .build()
            .map_err(|err| ConfigError::HttpClient(err.to_string()))
    }
}

pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = Url::parse(trimmed).map_err(|err| {
        ConfigError::InvalidConfiguration(format!(
            "{API_BASE_URL_VAR} is not a valid url '{trimmed}': {err}"
        ))
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidConfiguration(format!(
            "{API_BASE_URL_VAR} must start with http:// or https://"
        )));
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{ClientConfig, ConfigError, DEFAULT_API_BASE_URL, StaleResponsePolicy};

    fn config_from(vars: &[(&str, &str)]) -> Result<ClientConfig, ConfigError> {
        let vars = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        ClientConfig::from_lookup(&|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]).expect("empty env should produce defaults");

        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.http_timeout_ms, 0);
        assert!(config.http_timeout().is_none());
        assert_eq!(config.stale_responses, StaleResponsePolicy::Discard);
    }

    #[test]
    fn base_url_trailing_slashes_are_stripped() {
        let config = config_from(&[("ASK_API_BASE_URL", " https://rag.example.com/api// ")])
            .expect("valid base url should parse");

        assert_eq!(config.api_base_url, "https://rag.example.com/api");
    }

    #[test]
    fn blank_base_url_falls_back_to_default() {
        let config = config_from(&[("ASK_API_BASE_URL", "   ")]).expect("blank is ignored");

        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn non_http_base_url_is_rejected() {
        let err = config_from(&[("ASK_API_BASE_URL", "ftp://files.example.com")])
            .expect_err("ftp scheme should be rejected");

        assert!(matches!(err, ConfigError::InvalidConfiguration(_)));
    }

    #[test]
    fn timeout_and_stale_policy_are_parsed() {
        let config = config_from(&[
            ("ASK_HTTP_TIMEOUT_MS", "2500"),
            ("ASK_STALE_RESPONSES", "Apply"),
        ])
        .expect("config should parse");

        assert_eq!(config.http_timeout_ms, 2500);
        assert_eq!(
            config.http_timeout(),
            Some(std::time::Duration::from_millis(2500))
        );
        assert_eq!(config.stale_responses, StaleResponsePolicy::Apply);
    }

    #[test]
    fn invalid_timeout_reports_key_and_value() {
        let err = config_from(&[("ASK_HTTP_TIMEOUT_MS", "soon")])
            .expect_err("non-numeric timeout should fail");

        match err {
            ConfigError::ParseInt { key, value } => {
                assert_eq!(key, "ASK_HTTP_TIMEOUT_MS");
                assert_eq!(value, "soon");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unknown_stale_policy_is_rejected() {
        let err = config_from(&[("ASK_STALE_RESPONSES", "merge")])
            .expect_err("unknown policy should fail");

        assert!(err.to_string().contains("ASK_STALE_RESPONSES"));
    }
}
