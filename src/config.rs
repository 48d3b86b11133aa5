use std::path::Path;

use serde::{Deserialize, Serialize};

pub const ENV_EVENT_TTL_MS: &str = "CAMPUS_MAP_EVENT_TTL_MS";
pub const ENV_API_BASE_URL: &str = "CAMPUS_MAP_API_BASE_URL";
pub const ENV_REFRESH_INTERVAL_MS: &str = "CAMPUS_MAP_REFRESH_INTERVAL_MS";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapConfig {
    #[serde(default = "default_event_ttl_ms")]
    pub event_ttl_ms: u64,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            event_ttl_ms: default_event_ttl_ms(),
            api_base_url: default_api_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
            refresh_interval_ms: default_refresh_interval_ms(),
        }
    }
}

impl MapConfig {
    pub fn apply_env_overrides(&mut self) {
        if let Some(value) = env_u64(ENV_EVENT_TTL_MS) {
            self.event_ttl_ms = value;
        }
        if let Ok(value) = std::env::var(ENV_API_BASE_URL) {
            if !value.trim().is_empty() {
                self.api_base_url = value.trim().to_string();
            }
        }
        if let Some(value) = env_u64(ENV_REFRESH_INTERVAL_MS) {
            self.refresh_interval_ms = value;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.event_ttl()?;
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "api_base_url cannot be empty".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.refresh_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "refresh_interval_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Event time-to-live as a signed duration for timestamp arithmetic.
    pub fn event_ttl(&self) -> Result<chrono::Duration, ConfigError> {
        if self.event_ttl_ms == 0 {
            return Err(ConfigError::Invalid(
                "event_ttl_ms must be greater than 0".to_string(),
            ));
        }
        i64::try_from(self.event_ttl_ms)
            .ok()
            .and_then(chrono::Duration::try_milliseconds)
            .ok_or_else(|| {
                ConfigError::Invalid(format!("event_ttl_ms out of range: {}", self.event_ttl_ms))
            })
    }

    pub fn refresh_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.refresh_interval_ms)
    }
}

/// Read an optional JSON config file, then apply env overrides and validate.
pub fn load_map_config(path: Option<&Path>) -> Result<MapConfig, ConfigError> {
    let mut config = match path {
        Some(path) if path.exists() => {
            let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
            serde_json::from_str::<MapConfig>(&raw)?
        }
        Some(path) => {
            tracing::debug!("config file {} not found; using defaults", path.display());
            MapConfig::default()
        }
        None => MapConfig::default(),
    };

    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

fn env_u64(key: &str) -> Option<u64> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::warn!("ignoring {key}={raw}: {error}");
            None
        }
    }
}

fn default_event_ttl_ms() -> u64 {
    60 * 60 * 1000
}

fn default_api_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_refresh_interval_ms() -> u64 {
    60_000
}
