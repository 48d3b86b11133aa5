use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use campus_map::runtime::ManualClock;
use campus_map::source::{BuildingSource, EventSource};
use campus_map::{
    init_tracing, load_map_config, HttpCampusSource, MapConfig, MapSession, SourceError,
    TracingView,
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    if let Err(error) = run().await {
        eprintln!("campus-map failed: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("replay") => run_replay(parse_replay(args)?).await,
        Some("live") => run_live(parse_live(args)?).await,
        Some("--help") | Some("-h") | None => {
            print_help();
            Ok(())
        }
        Some(other) => Err(format!("unknown command: {other} (try --help)")),
    }
}

// ---------------------------------------------------------------------------
// replay
// ---------------------------------------------------------------------------

struct ReplayOptions {
    events: PathBuf,
    buildings: Option<PathBuf>,
    ttl_ms: Option<u64>,
    advance_ms: u64,
    building: Option<String>,
}

fn parse_replay(mut args: impl Iterator<Item = String>) -> Result<ReplayOptions, String> {
    let mut events = None;
    let mut buildings = None;
    let mut ttl_ms = None;
    let mut advance_ms = 0u64;
    let mut building = None;

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
            None => (arg, None),
        };
        let mut value = || {
            inline
                .clone()
                .or_else(|| args.next())
                .ok_or_else(|| format!("{flag} requires a value"))
        };
        match flag.as_str() {
            "--events" => events = Some(PathBuf::from(value()?)),
            "--buildings" => buildings = Some(PathBuf::from(value()?)),
            "--ttl-ms" => ttl_ms = Some(parse_positive_u64(&value()?, "--ttl-ms")?),
            "--advance-ms" => advance_ms = parse_u64(&value()?, "--advance-ms")?,
            "--building" => building = Some(value()?),
            other => return Err(format!("unknown replay flag: {other}")),
        }
    }

    Ok(ReplayOptions {
        events: events.ok_or_else(|| "replay requires --events FILE".to_string())?,
        buildings,
        ttl_ms,
        advance_ms,
        building,
    })
}

async fn run_replay(options: ReplayOptions) -> Result<(), String> {
    let mut config = MapConfig::default();
    config.apply_env_overrides();
    if let Some(ttl_ms) = options.ttl_ms {
        config.event_ttl_ms = ttl_ms;
    }
    config.validate().map_err(|e| e.to_string())?;

    let files = FileSource {
        events: options.events,
        buildings: options.buildings,
    };
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let mut session = MapSession::with_clock(&config, Arc::new(TracingView::new()), clock.clone())
        .map_err(|e| e.to_string())?;

    let ingested = session
        .bootstrap(&files, &files)
        .await
        .map_err(|e| e.to_string())?;
    println!(
        "ingested: {} new, {} markers placed, {} live",
        ingested.new_events, ingested.markers_placed, ingested.live_events
    );
    if let Some(building) = options.building.as_deref() {
        session.open_building(building);
    }

    clock.try_advance_millis(options.advance_ms).ok_or_else(|| {
        format!(
            "--advance-ms {} is out of range for the replay clock",
            options.advance_ms
        )
    })?;
    let purged = session.purge_now();
    println!(
        "after {} ms: {} expired, {} markers removed",
        options.advance_ms,
        purged.expired.len(),
        purged.markers_removed
    );
    for key in &purged.expired {
        println!("  expired {key}");
    }

    session.shutdown();
    Ok(())
}

/// Reads loader responses from JSON files instead of the network.
struct FileSource {
    events: PathBuf,
    buildings: Option<PathBuf>,
}

#[async_trait]
impl EventSource for FileSource {
    async fn fetch_events(&self) -> Result<Vec<Value>, SourceError> {
        read_rows(&self.events).await
    }
}

#[async_trait]
impl BuildingSource for FileSource {
    async fn fetch_buildings(&self) -> Result<Vec<Value>, SourceError> {
        match &self.buildings {
            Some(path) => read_rows(path).await,
            None => Ok(Vec::new()),
        }
    }
}

async fn read_rows(path: &Path) -> Result<Vec<Value>, SourceError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SourceError::Request(format!("{}: {e}", path.display())))?;
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Array(rows)) => Ok(rows),
        Ok(_) => Err(SourceError::InvalidResponse(format!(
            "{}: expected a JSON array",
            path.display()
        ))),
        Err(error) => Err(SourceError::InvalidResponse(format!(
            "{}: {error}",
            path.display()
        ))),
    }
}

// ---------------------------------------------------------------------------
// live
// ---------------------------------------------------------------------------

fn parse_live(mut args: impl Iterator<Item = String>) -> Result<Option<PathBuf>, String> {
    let mut config = None;
    while let Some(arg) = args.next() {
        if let Some(value) = arg.strip_prefix("--config=") {
            config = Some(PathBuf::from(value));
            continue;
        }
        if arg == "--config" {
            let value = args
                .next()
                .ok_or_else(|| "--config requires a value".to_string())?;
            config = Some(PathBuf::from(value));
            continue;
        }
        return Err(format!("unknown live flag: {arg}"));
    }
    Ok(config)
}

async fn run_live(config_path: Option<PathBuf>) -> Result<(), String> {
    let config = load_map_config(config_path.as_deref()).map_err(|e| e.to_string())?;
    let source = HttpCampusSource::from_config(&config).map_err(|e| e.to_string())?;
    let mut session =
        MapSession::new(&config, Arc::new(TracingView::new())).map_err(|e| e.to_string())?;

    tracing::info!(base_url = source.base_url(), "starting live session");
    // Failures are already surfaced through the view; keep running so the
    // next refresh can recover.
    if let Err(error) = session.bootstrap(&source, &source).await {
        tracing::warn!("initial load incomplete: {error}");
    }
    session.start_purging().map_err(|e| e.to_string())?;

    let refreshes = refresh_until(
        &session,
        &source,
        config.refresh_interval(),
        tokio::signal::ctrl_c(),
    )
    .await;
    tracing::info!(refreshes, "shutting down live session");

    session.shutdown();
    Ok(())
}

/// Refresh events every `period` until `shutdown` resolves. The shutdown
/// future is created once and polled across iterations, so a signal that
/// lands while a refresh is in flight is still seen. Returns the number of
/// refreshes attempted.
async fn refresh_until(
    session: &MapSession,
    source: &dyn EventSource,
    period: Duration,
    shutdown: impl Future<Output = std::io::Result<()>>,
) -> u64 {
    let mut refresh = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    refresh.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut refreshes = 0u64;
    loop {
        tokio::select! {
            _ = refresh.tick() => {
                refreshes += 1;
                if let Ok(report) = session.refresh_events(source).await {
                    tracing::debug!(new = report.new_events, live = report.live_events, "refreshed");
                }
            }
            signal = &mut shutdown => {
                if let Err(error) = signal {
                    tracing::warn!("ctrl-c handler failed: {error}");
                }
                return refreshes;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

fn parse_u64(value: &str, flag: &str) -> Result<u64, String> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| format!("{flag} expects a non-negative integer, got '{value}'"))
}

fn parse_positive_u64(value: &str, flag: &str) -> Result<u64, String> {
    match parse_u64(value, flag)? {
        0 => Err(format!("{flag} must be greater than 0")),
        parsed => Ok(parsed),
    }
}

fn print_help() {
    println!(
        "campus-map

USAGE:
  campus-map replay --events FILE [--buildings FILE] [--ttl-ms N] [--advance-ms N] [--building ID]
  campus-map live [--config FILE]

replay   Ingest a JSON events snapshot on a manual clock, advance it, and
         run one purge pass. Every view instruction is logged.
live     Load buildings and events over HTTP, purge every 10s and refresh
         events on the configured interval until Ctrl-C.

Environment:
  CAMPUS_MAP_EVENT_TTL_MS, CAMPUS_MAP_API_BASE_URL, CAMPUS_MAP_REFRESH_INTERVAL_MS
  RUST_LOG (default: campus_map=debug,info)"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EventSource for CountingSource {
        async fn fetch_events(&self) -> Result<Vec<Value>, SourceError> {
            let call = self.calls.fetch_add(1, Ordering::Relaxed);
            Ok(vec![json!({ "id": call, "lat": 40.44, "lng": -79.95 })])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_deadline_outlasting_many_refreshes_still_fires() {
        let session = MapSession::new(&MapConfig::default(), Arc::new(TracingView::new())).unwrap();
        let source = CountingSource {
            calls: AtomicUsize::new(0),
        };
        let period = Duration::from_secs(1);

        let shutdown = async {
            tokio::time::sleep(Duration::from_millis(3500)).await;
            Ok(())
        };
        let refreshes = refresh_until(&session, &source, period, shutdown).await;

        assert_eq!(refreshes, 3);
        assert_eq!(source.calls.load(Ordering::Relaxed), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn ready_shutdown_stops_before_first_refresh() {
        let session = MapSession::new(&MapConfig::default(), Arc::new(TracingView::new())).unwrap();
        let source = CountingSource {
            calls: AtomicUsize::new(0),
        };

        let refreshes = refresh_until(
            &session,
            &source,
            Duration::from_secs(60),
            std::future::ready(Ok(())),
        )
        .await;

        assert_eq!(refreshes, 0);
    }

    #[test]
    fn replay_flags_parse_inline_and_separate_values() {
        let args = ["--events=e.json", "--advance-ms", "1001", "--ttl-ms=1000"]
            .into_iter()
            .map(String::from);
        let options = parse_replay(args).unwrap();
        assert_eq!(options.events, PathBuf::from("e.json"));
        assert_eq!(options.advance_ms, 1001);
        assert_eq!(options.ttl_ms, Some(1000));
    }

    #[test]
    fn replay_rejects_non_numeric_advance() {
        let args = ["--events", "e.json", "--advance-ms", "-5"]
            .into_iter()
            .map(String::from);
        assert!(parse_replay(args).is_err());
    }
}
