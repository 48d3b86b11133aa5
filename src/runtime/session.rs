use std::sync::Arc;

use serde_json::Value;

use crate::buildings::BuildingDirectory;
use crate::config::MapConfig;
use crate::events::Coordinates;
use crate::filter::{failed_options, RouteSelectors};
use crate::route::{route_polyline, RouteError};
use crate::source::{BuildingSource, EventSource, RouteSource, SourceError};
use crate::view::{MapView, MarkerHandle, RouteHandle, SelectorSide};
use crate::AppError;

use super::clock::{Clock, SystemClock};
use super::layer::{EventLayer, IngestReport, PurgeReport, SharedLayer};
use super::purge::{PurgeScheduler, SchedulerState};

/// Application state for one map page, from startup to teardown.
pub struct MapSession {
    view: Arc<dyn MapView>,
    clock: Arc<dyn Clock>,
    layer: SharedLayer,
    purge: PurgeScheduler,
    selectors: RouteSelectors,
    current_location: Option<Coordinates>,
    drop_mode: bool,
    route: Option<RouteHandle>,
}

impl MapSession {
    pub fn new(config: &MapConfig, view: Arc<dyn MapView>) -> Result<Self, AppError> {
        Self::with_clock(config, view, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: &MapConfig,
        view: Arc<dyn MapView>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AppError> {
        let layer = EventLayer::shared(view.clone());
        let mut purge = PurgeScheduler::new(layer.clone(), clock.clone());
        purge.set_ttl(config.event_ttl()?)?;

        Ok(Self {
            view,
            clock,
            layer,
            purge,
            selectors: RouteSelectors::new(),
            current_location: None,
            drop_mode: false,
            route: None,
        })
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Fetch buildings and events together. Buildings are applied first so
    /// event markers can fall back to building coordinates.
    pub async fn bootstrap(
        &mut self,
        buildings: &dyn BuildingSource,
        events: &dyn EventSource,
    ) -> Result<IngestReport, AppError> {
        let (building_rows, event_rows) =
            futures::join!(buildings.fetch_buildings(), events.fetch_events());
        let buildings_loaded = self.accept_buildings(building_rows);
        let ingested = self.accept_events(event_rows);
        buildings_loaded?;
        ingested
    }

    pub async fn load_buildings(&mut self, source: &dyn BuildingSource) -> Result<usize, AppError> {
        let rows = source.fetch_buildings().await;
        self.accept_buildings(rows)
    }

    /// Fetch and apply one event snapshot. On failure the index is left as it
    /// was and the error is shown once.
    pub async fn refresh_events(&self, source: &dyn EventSource) -> Result<IngestReport, AppError> {
        let rows = source.fetch_events().await;
        self.accept_events(rows)
    }

    pub fn apply_events(&self, records: &[Value]) -> IngestReport {
        let now = self.clock.now();
        let report = self.lock_layer().apply_snapshot(records, now);
        tracing::debug!(
            new = report.new_events,
            placed = report.markers_placed,
            live = report.live_events,
            "event snapshot applied"
        );
        report
    }

    fn accept_events(
        &self,
        rows: Result<Vec<Value>, SourceError>,
    ) -> Result<IngestReport, AppError> {
        match rows {
            Ok(rows) => Ok(self.apply_events(&rows)),
            Err(error) => {
                tracing::warn!("event refresh failed; keeping previous events: {error}");
                self.view
                    .show_error(&format!("Unable to refresh events: {error}"));
                Err(error.into())
            }
        }
    }

    fn accept_buildings(&mut self, rows: Result<Vec<Value>, SourceError>) -> Result<usize, AppError> {
        match rows {
            Ok(rows) => {
                let directory = BuildingDirectory::from_records(&rows);
                let count = directory.len();
                let placed = self.lock_layer().set_buildings(directory);
                self.render_selector(SelectorSide::Start);
                self.render_selector(SelectorSide::End);
                tracing::info!("loaded {count} buildings; {placed} marker(s) placed");
                Ok(count)
            }
            Err(error) => {
                tracing::warn!("building list failed to load: {error}");
                let failed = failed_options();
                self.view
                    .render_building_options(SelectorSide::Start, &failed);
                self.view.render_building_options(SelectorSide::End, &failed);
                self.view.show_error(&format!(
                    "Failed to load building list from server: {error}"
                ));
                Err(error.into())
            }
        }
    }

    // -----------------------------------------------------------------------
    // Building detail view
    // -----------------------------------------------------------------------

    pub fn open_building(&self, building_id: &str) {
        self.lock_layer().open_building(building_id);
    }

    pub fn close_building(&self) {
        self.lock_layer().close_building();
    }

    // -----------------------------------------------------------------------
    // Route selectors
    // -----------------------------------------------------------------------

    pub fn set_filter(&mut self, side: SelectorSide, query: &str) {
        let options = {
            let layer = self.layer.lock().expect("event layer mutex poisoned");
            self.selectors.set_query(side, query, layer.buildings())
        };
        self.view.render_building_options(side, &options);
    }

    pub fn select(&mut self, side: SelectorSide, building_id: Option<&str>) {
        self.selectors.select(side, building_id);
        self.render_selector(side);
    }

    pub fn selectors(&self) -> &RouteSelectors {
        &self.selectors
    }

    fn render_selector(&self, side: SelectorSide) {
        let options = self.selectors.render(side, self.lock_layer().buildings());
        self.view.render_building_options(side, &options);
    }

    /// Ask the routing collaborator for a path between the selected
    /// buildings and draw it, replacing any previous route.
    pub async fn request_route(&mut self, source: &dyn RouteSource) -> Result<usize, AppError> {
        let Some((start, end)) = self
            .selectors
            .endpoints()
            .map(|(start, end)| (start.to_string(), end.to_string()))
        else {
            return Err(self.surface(RouteError::MissingSelection.into()));
        };

        let response = match source.fetch_route(&start, &end).await {
            Ok(response) => response,
            Err(error) => return Err(self.surface(error.into())),
        };
        let points = match route_polyline(&response.path) {
            Ok(points) => points,
            Err(error) => return Err(self.surface(error.into())),
        };

        self.clear_route();
        self.route = Some(self.view.draw_route(&points));
        tracing::debug!(start = %start, end = %end, stops = points.len(), "route drawn");
        Ok(points.len())
    }

    pub fn clear_route(&mut self) {
        if let Some(handle) = self.route.take() {
            self.view.clear_route(handle);
        }
    }

    fn surface(&self, error: AppError) -> AppError {
        tracing::warn!("{error}");
        self.view.show_error(&error.to_string());
        error
    }

    // -----------------------------------------------------------------------
    // Custom markers and location
    // -----------------------------------------------------------------------

    /// Flip drop-marker mode and return the new state.
    pub fn toggle_drop_mode(&mut self) -> bool {
        self.drop_mode = !self.drop_mode;
        self.drop_mode
    }

    pub fn is_drop_mode(&self) -> bool {
        self.drop_mode
    }

    /// Place a user marker at a clicked point. Only works in drop mode and
    /// leaves drop mode afterwards. A blank title cancels the drop.
    pub fn drop_marker(
        &mut self,
        at: Coordinates,
        title: &str,
        description: &str,
    ) -> Option<MarkerHandle> {
        if !self.drop_mode {
            return None;
        }
        let title = title.trim();
        if title.is_empty() {
            return None;
        }
        let handle = self
            .lock_layer()
            .markers_mut()
            .place_custom(at, title, description.trim());
        self.drop_mode = false;
        Some(handle)
    }

    pub fn set_current_location(&mut self, location: Option<Coordinates>) {
        self.current_location = location;
    }

    pub fn current_location(&self) -> Option<Coordinates> {
        self.current_location
    }

    // -----------------------------------------------------------------------
    // Purging and teardown
    // -----------------------------------------------------------------------

    pub fn start_purging(&mut self) -> Result<(), AppError> {
        Ok(self.purge.start()?)
    }

    pub fn restart_purging(&mut self) -> Result<(), AppError> {
        Ok(self.purge.restart()?)
    }

    pub fn stop_purging(&mut self) {
        self.purge.stop();
    }

    pub fn purge_now(&self) -> PurgeReport {
        self.purge.tick_now()
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.purge.state()
    }

    pub fn layer(&self) -> SharedLayer {
        self.layer.clone()
    }

    /// Stop the timer and take everything this session put on the map off it.
    pub fn shutdown(&mut self) {
        self.purge.stop();
        {
            let mut layer = self.lock_layer();
            layer.close_building();
            layer.markers_mut().clear();
        }
        self.clear_route();
        self.selectors.reset();
        self.current_location = None;
        self.drop_mode = false;
        tracing::info!("map session shut down");
    }

    fn lock_layer(&self) -> std::sync::MutexGuard<'_, EventLayer> {
        self.layer.lock().expect("event layer mutex poisoned")
    }
}
