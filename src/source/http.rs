use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::MapConfig;

use super::{BuildingSource, EventSource, RouteResponse, RouteSource, SourceError};

/// Campus API client for `/api/events`, `/api/buildings` and `/api/pathfind`.
pub struct HttpCampusSource {
    base_url: String,
    client: reqwest::Client,
}

impl HttpCampusSource {
    pub fn new(base_url: &str, timeout_ms: u64) -> Result<Self, SourceError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(SourceError::Request("api base url cannot be empty".to_string()));
        }
        if timeout_ms == 0 {
            return Err(SourceError::Request(
                "request timeout must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            base_url,
            client: reqwest::Client::builder()
                .timeout(Duration::from_millis(timeout_ms))
                .build()
                .map_err(|error| SourceError::Request(error.to_string()))?,
        })
    }

    pub fn from_config(config: &MapConfig) -> Result<Self, SourceError> {
        Self::new(&config.api_base_url, config.request_timeout_ms)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json(&self, url: &str) -> Result<Value, SourceError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }
        Ok(response.json::<Value>().await?)
    }

    async fn get_rows(&self, path: &str) -> Result<Vec<Value>, SourceError> {
        let url = format!("{}{path}", self.base_url);
        match self.get_json(&url).await? {
            Value::Array(rows) => Ok(rows),
            other => Err(SourceError::InvalidResponse(format!(
                "expected a JSON array from {path}, got {}",
                json_kind(&other)
            ))),
        }
    }
}

/// Prefer the API's `{"error": "..."}` body; fall back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("error")?.as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[async_trait]
impl EventSource for HttpCampusSource {
    async fn fetch_events(&self) -> Result<Vec<Value>, SourceError> {
        self.get_rows("/api/events").await
    }
}

#[async_trait]
impl BuildingSource for HttpCampusSource {
    async fn fetch_buildings(&self) -> Result<Vec<Value>, SourceError> {
        self.get_rows("/api/buildings").await
    }
}

#[async_trait]
impl RouteSource for HttpCampusSource {
    async fn fetch_route(&self, start: &str, end: &str) -> Result<RouteResponse, SourceError> {
        let url = format!(
            "{}/api/pathfind?start={}&end={}",
            self.base_url,
            urlencoding::encode(start),
            urlencoding::encode(end)
        );
        let body = self.get_json(&url).await?;
        serde_json::from_value(body).map_err(|error| {
            SourceError::InvalidResponse(format!("malformed pathfind response: {error}"))
        })
    }
}
