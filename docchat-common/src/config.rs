//! Configuration management for docchat services.
//!
//! All settings come from environment variables with defaults, loaded once
//! at startup into a single [`Config`] that is validated and then passed
//! down by reference. No other layer reads the environment.
//!
//! # Environment Variable Mapping
//!
//! - `DOCCHAT_MODEL` → model
//! - `OLLAMA_BASE_URL` → ollama_base_url
//! - `DOCCHAT_TEMPERATURE` → temperature
//! - `DOCCHAT_HISTORY_LIMIT` → history_limit
//! - `DOCCHAT_MAX_CONTEXT_LENGTH` → max_context_length
//! - `DOCCHAT_MAX_CHUNK_LENGTH` → max_chunk_length
//! - `DOCCHAT_RETRY_ATTEMPTS` → retry_attempts
//! - `DOCCHAT_MIN_RETRY_WAIT` / `DOCCHAT_MAX_RETRY_WAIT` → retry wait window (seconds)
//! - `DOCCHAT_CONCURRENT_REQUESTS` → concurrent_requests
//! - `DOCCHAT_SESSION_TTL` → session_ttl_secs
//! - `DOCCHAT_BIND` / `DOCCHAT_PORT` → network bind
//! - `DOCCHAT_LOG_LEVEL` / `DOCCHAT_LOG_FORMAT` → logging

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Unified configuration for all docchat services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Model identifier passed to the backend.
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the Ollama backend.
    #[serde(default = "default_ollama_base_url")]
    pub ollama_base_url: String,

    /// Sampling temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Number of recent chat turns included in a prompt.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Character ceiling for the context segment of a prompt.
    #[serde(default = "default_max_context_length")]
    pub max_context_length: usize,

    /// Character ceiling for a single retrieved fragment.
    #[serde(default = "default_max_chunk_length")]
    pub max_chunk_length: usize,

    /// Total backend attempts before a generation fails.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Minimum backoff between retries, in seconds.
    #[serde(default = "default_min_retry_wait")]
    pub min_retry_wait_secs: u64,

    /// Maximum backoff between retries, in seconds.
    #[serde(default = "default_max_retry_wait")]
    pub max_retry_wait_secs: u64,

    /// Cap on simultaneous in-flight backend calls.
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    /// Sliding session time-to-live, in seconds.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    /// Bind address for the HTTP server.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Port for the HTTP server.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Base log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format: "json" or "pretty".
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_model() -> String {
    "deepseek-r1:1.5b".into()
}
fn default_ollama_base_url() -> String {
    "http://localhost:11434".into()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_history_limit() -> usize {
    10
}
fn default_max_context_length() -> usize {
    8000
}
fn default_max_chunk_length() -> usize {
    2000
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_min_retry_wait() -> u64 {
    4
}
fn default_max_retry_wait() -> u64 {
    10
}
fn default_concurrent_requests() -> usize {
    100
}
fn default_session_ttl() -> u64 {
    1800
}
fn default_bind() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8000
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "pretty".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: default_model(),
            ollama_base_url: default_ollama_base_url(),
            temperature: default_temperature(),
            history_limit: default_history_limit(),
            max_context_length: default_max_context_length(),
            max_chunk_length: default_max_chunk_length(),
            retry_attempts: default_retry_attempts(),
            min_retry_wait_secs: default_min_retry_wait(),
            max_retry_wait_secs: default_max_retry_wait(),
            concurrent_requests: default_concurrent_requests(),
            session_ttl_secs: default_session_ttl(),
            bind: default_bind(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env_var(name) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{name} has invalid value {raw:?}"))),
        None => Ok(None),
    }
}

impl Config {
    /// Load configuration from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(model) = env_var("DOCCHAT_MODEL") {
            config.model = model;
        }
        if let Some(url) = env_var("OLLAMA_BASE_URL") {
            config.ollama_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(v) = parse_env("DOCCHAT_TEMPERATURE")? {
            config.temperature = v;
        }
        if let Some(v) = parse_env("DOCCHAT_HISTORY_LIMIT")? {
            config.history_limit = v;
        }
        if let Some(v) = parse_env("DOCCHAT_MAX_CONTEXT_LENGTH")? {
            config.max_context_length = v;
        }
        if let Some(v) = parse_env("DOCCHAT_MAX_CHUNK_LENGTH")? {
            config.max_chunk_length = v;
        }
        if let Some(v) = parse_env("DOCCHAT_RETRY_ATTEMPTS")? {
            config.retry_attempts = v;
        }
        if let Some(v) = parse_env("DOCCHAT_MIN_RETRY_WAIT")? {
            config.min_retry_wait_secs = v;
        }
        if let Some(v) = parse_env("DOCCHAT_MAX_RETRY_WAIT")? {
            config.max_retry_wait_secs = v;
        }
        if let Some(v) = parse_env("DOCCHAT_CONCURRENT_REQUESTS")? {
            config.concurrent_requests = v;
        }
        if let Some(v) = parse_env("DOCCHAT_SESSION_TTL")? {
            config.session_ttl_secs = v;
        }
        if let Some(bind) = env_var("DOCCHAT_BIND") {
            config.bind = bind;
        }
        if let Some(v) = parse_env("DOCCHAT_PORT")? {
            config.port = v;
        }
        if let Some(level) = env_var("DOCCHAT_LOG_LEVEL") {
            config.log_level = level;
        }
        if let Some(format) = env_var("DOCCHAT_LOG_FORMAT") {
            config.log_format = format;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration once at startup.
    pub fn validate(&self) -> Result<()> {
        if self.retry_attempts < 1 {
            return Err(Error::Config("retry_attempts must be at least 1".into()));
        }
        if self.min_retry_wait_secs > self.max_retry_wait_secs {
            return Err(Error::Config(
                "min_retry_wait must not exceed max_retry_wait".into(),
            ));
        }
        if self.concurrent_requests < 1 {
            return Err(Error::Config(
                "concurrent_requests must be at least 1".into(),
            ));
        }
        if self.history_limit < 1 {
            return Err(Error::Config("history_limit must be at least 1".into()));
        }
        if self.session_ttl_secs < 1 {
            return Err(Error::Config("session_ttl must be at least 1 second".into()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::Config(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.max_context_length == 0 {
            return Err(Error::Config("max_context_length must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.model, "deepseek-r1:1.5b");
        assert_eq!(config.session_ttl_secs, 1800);
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.min_retry_wait_secs, 4);
        assert_eq!(config.max_retry_wait_secs, 10);
        assert_eq!(config.concurrent_requests, 100);
        assert_eq!(config.history_limit, 10);
    }

    #[test]
    fn rejects_zero_retry_attempts() {
        let config = Config {
            retry_attempts: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_inverted_retry_window() {
        let config = Config {
            min_retry_wait_secs: 20,
            max_retry_wait_secs: 10,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_temperature() {
        let config = Config {
            temperature: 3.5,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_concurrency() {
        let config = Config {
            concurrent_requests: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_deserializes_with_partial_fields() {
        let config: Config = serde_json::from_str(r#"{"model":"llama3","port":9000}"#).unwrap();
        assert_eq!(config.model, "llama3");
        assert_eq!(config.port, 9000);
        assert_eq!(config.history_limit, 10);
    }
}
