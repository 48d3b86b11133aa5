use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::clock::Clock;
use super::layer::{PurgeReport, SharedLayer};

pub const PURGE_INTERVAL: Duration = Duration::from_secs(10);

pub fn default_event_ttl() -> chrono::Duration {
    chrono::Duration::hours(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("purge scheduler is already running")]
    AlreadyRunning,
    #[error("purge scheduler was stopped; use restart")]
    Stopped,
    #[error("ttl can only be changed before the scheduler starts")]
    NotIdle,
    #[error("no tokio runtime available to run the purge timer")]
    NoRuntime,
}

/// Periodic expiry of stale events.
///
/// Idle → Running on `start`, Running → Stopped on `stop`, and back to
/// Running only through `restart`. The timer task's handle is kept so
/// `stop` (and drop) cancel it deterministically.
pub struct PurgeScheduler {
    layer: SharedLayer,
    clock: Arc<dyn Clock>,
    ttl: chrono::Duration,
    interval: Duration,
    state: SchedulerState,
    task: Option<JoinHandle<()>>,
    ticks: Arc<AtomicU64>,
}

impl PurgeScheduler {
    pub fn new(layer: SharedLayer, clock: Arc<dyn Clock>) -> Self {
        Self {
            layer,
            clock,
            ttl: default_event_ttl(),
            interval: PURGE_INTERVAL,
            state: SchedulerState::Idle,
            task: None,
            ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn set_ttl(&mut self, ttl: chrono::Duration) -> Result<(), SchedulerError> {
        if self.state != SchedulerState::Idle {
            return Err(SchedulerError::NotIdle);
        }
        self.ttl = ttl;
        Ok(())
    }

    pub fn ttl(&self) -> chrono::Duration {
        self.ttl
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Number of timer-driven ticks that have run.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn start(&mut self) -> Result<(), SchedulerError> {
        match self.state {
            SchedulerState::Idle => self.spawn(),
            SchedulerState::Running => Err(SchedulerError::AlreadyRunning),
            SchedulerState::Stopped => Err(SchedulerError::Stopped),
        }
    }

    pub fn restart(&mut self) -> Result<(), SchedulerError> {
        match self.state {
            SchedulerState::Running => Err(SchedulerError::AlreadyRunning),
            SchedulerState::Idle | SchedulerState::Stopped => self.spawn(),
        }
    }

    /// Cancel the timer. Removals already applied by a finished tick stay
    /// applied; no further tick runs.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if self.state != SchedulerState::Stopped {
            tracing::info!("purge scheduler stopped");
        }
        self.state = SchedulerState::Stopped;
    }

    /// Run one purge pass right now, outside the timer.
    pub fn tick_now(&self) -> PurgeReport {
        purge_tick(&self.layer, self.clock.as_ref(), self.ttl)
    }

    fn spawn(&mut self) -> Result<(), SchedulerError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;
        let layer = self.layer.clone();
        let clock = self.clock.clone();
        let ticks = self.ticks.clone();
        let ttl = self.ttl;
        let period = self.interval;

        self.task = Some(runtime.spawn(async move {
            let mut timer = time::interval_at(Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                timer.tick().await;
                purge_tick(&layer, clock.as_ref(), ttl);
                ticks.fetch_add(1, Ordering::Relaxed);
            }
        }));
        self.state = SchedulerState::Running;
        tracing::info!(
            interval_ms = period.as_millis() as u64,
            ttl_ms = ttl.num_milliseconds(),
            "purge scheduler running"
        );
        Ok(())
    }
}

impl Drop for PurgeScheduler {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

fn purge_tick(layer: &SharedLayer, clock: &dyn Clock, ttl: chrono::Duration) -> PurgeReport {
    let now = clock.now();
    let report = layer
        .lock()
        .expect("event layer mutex poisoned")
        .purge(now, ttl);
    if !report.is_empty() {
        tracing::debug!(
            expired = report.expired.len(),
            markers_removed = report.markers_removed,
            "purge tick"
        );
    }
    report
}
