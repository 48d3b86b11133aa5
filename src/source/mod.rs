//! Loaders for events, buildings and routes.
//!
//! The core only consumes what these return. Retry cadence and refresh
//! timing belong to whoever drives them.

mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use http::HttpCampusSource;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("request timeout: {0}")]
    Timeout(String),
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            return Self::Timeout(value.to_string());
        }
        if value.is_decode() {
            return Self::InvalidResponse(value.to_string());
        }
        Self::Request(value.to_string())
    }
}

/// What the routing collaborator returns: building rows along the path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteResponse {
    #[serde(default)]
    pub path: Vec<Value>,
    #[serde(default)]
    pub distance: Option<f64>,
}

#[async_trait]
pub trait EventSource: Send + Sync {
    async fn fetch_events(&self) -> Result<Vec<Value>, SourceError>;
}

#[async_trait]
pub trait BuildingSource: Send + Sync {
    async fn fetch_buildings(&self) -> Result<Vec<Value>, SourceError>;
}

#[async_trait]
pub trait RouteSource: Send + Sync {
    async fn fetch_route(&self, start: &str, end: &str) -> Result<RouteResponse, SourceError>;
}
