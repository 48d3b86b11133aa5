//! Campus map event layer.
//!
//! Keeps a time-ordered index of campus events per building, mirrors it onto
//! a map view as markers, and expires events once they outlive their TTL.
//! Also carries the building selectors of the route panel and their
//! subsequence filter.
//!
//! # Architecture
//!
//! - `events`: event records and the per-building arrival-ordered index
//! - `markers`: keeps view markers in step with the index
//! - `runtime`: shared layer, purge timer, and the `MapSession` façade
//! - `filter`: subsequence building filter and selector state
//! - `source`: event, building and route loaders (HTTP by default)
//! - `view`: the `MapView` seam and a tracing-backed headless view
//! - `config`: TTL, endpoint and refresh settings

pub mod buildings;
pub mod config;
pub mod events;
pub mod filter;
pub mod markers;
pub mod route;
pub mod runtime;
pub mod source;
pub mod view;

#[cfg(test)]
mod testing;
#[cfg(test)]
mod tests;

pub use buildings::{BuildingDirectory, BuildingRecord};
pub use config::{load_map_config, ConfigError, MapConfig};
pub use events::{Coordinates, Event, EventIndex, EventKey};
pub use route::RouteError;
pub use runtime::{MapSession, SchedulerError};
pub use source::{HttpCampusSource, SourceError};
pub use view::{MapView, TracingView};

// ---------------------------------------------------------------------------
// Shared error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Source(#[from] SourceError),
    #[error("{0}")]
    Route(#[from] RouteError),
    #[error("{0}")]
    Scheduler(#[from] SchedulerError),
    #[error("{0}")]
    Other(String),
}

/// Install the global fmt subscriber. `RUST_LOG` wins over the default
/// filter. Safe to call more than once.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "campus_map=debug,info".parse().expect("valid env filter"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
