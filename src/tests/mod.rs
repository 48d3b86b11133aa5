//! Cross-module scenarios: index, markers, scheduler and selectors driven
//! together through `MapSession` against a recording view.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use crate::config::MapConfig;
use crate::runtime::{MapSession, ManualClock};
use crate::testing::RecordingView;



pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0).unwrap()
}

/// A session on a manual clock with the given TTL.
pub fn session_with_ttl(ttl_ms: u64) -> (MapSession, Arc<RecordingView>, Arc<ManualClock>) {
    let view = Arc::new(RecordingView::new());
    let clock = Arc::new(ManualClock::new(epoch()));
    let config = MapConfig {
        event_ttl_ms: ttl_ms,
        ..MapConfig::default()
    };
    let session = MapSession::with_clock(&config, view.clone(), clock.clone())
        .expect("valid test config");
    (session, view, clock)
}
