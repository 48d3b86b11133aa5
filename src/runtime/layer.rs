use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::buildings::BuildingDirectory;
use crate::events::{EventIndex, EventKey};
use crate::markers::MarkerSynchronizer;
use crate::view::MapView;

pub type SharedLayer = Arc<Mutex<EventLayer>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub new_events: usize,
    pub markers_placed: usize,
    pub live_events: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub expired: Vec<EventKey>,
    pub markers_removed: usize,
    pub detail_rerendered: bool,
}

impl PurgeReport {
    pub fn is_empty(&self) -> bool {
        self.expired.is_empty()
    }
}

/// Everything an ingest or a purge tick touches, behind one lock.
pub struct EventLayer {
    index: EventIndex,
    markers: MarkerSynchronizer,
    buildings: BuildingDirectory,
    detail: Option<String>,
    view: Arc<dyn MapView>,
}

impl EventLayer {
    pub fn new(view: Arc<dyn MapView>) -> Self {
        Self {
            index: EventIndex::new(),
            markers: MarkerSynchronizer::new(view.clone()),
            buildings: BuildingDirectory::default(),
            detail: None,
            view,
        }
    }

    pub fn shared(view: Arc<dyn MapView>) -> SharedLayer {
        Arc::new(Mutex::new(Self::new(view)))
    }

    /// Ingest a snapshot, then reconcile markers against every live event so
    /// re-delivered events that gained or changed a position are covered.
    pub fn apply_snapshot(&mut self, records: &[Value], now: DateTime<Utc>) -> IngestReport {
        let fresh = self.index.ingest_at(records, now);
        let markers_placed = self.markers.reconcile(self.index.iter(), &self.buildings);
        self.render_detail();
        IngestReport {
            new_events: fresh.len(),
            markers_placed,
            live_events: self.index.len(),
        }
    }

    /// One purge pass: expire, drop markers, refresh the open listing.
    pub fn purge(&mut self, now: DateTime<Utc>, ttl: chrono::Duration) -> PurgeReport {
        let expired = self.index.expire(now, ttl);
        if expired.is_empty() {
            return PurgeReport::default();
        }
        let markers_removed = self.markers.remove(&expired);
        let detail_rerendered = self.render_detail();
        PurgeReport {
            expired: expired.into_iter().map(|event| event.key).collect(),
            markers_removed,
            detail_rerendered,
        }
    }

    pub fn open_building(&mut self, building_id: &str) {
        self.detail = Some(building_id.to_string());
        self.render_detail();
    }

    pub fn close_building(&mut self) {
        self.detail = None;
    }

    pub fn open_building_id(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Re-render the open listing, if any. Returns whether it rendered.
    pub fn render_detail(&self) -> bool {
        let Some(building_id) = self.detail.as_deref() else {
            return false;
        };
        let events = self.index.list_for_building(building_id);
        self.view
            .render_event_list(&self.buildings.label_for(building_id), &events);
        true
    }

    /// Swap in a new building directory. Events that fall back to building
    /// coordinates are re-placed. Returns how many markers were created.
    pub fn set_buildings(&mut self, buildings: BuildingDirectory) -> usize {
        self.buildings = buildings;
        let placed = self.markers.reconcile(self.index.iter(), &self.buildings);
        self.render_detail();
        placed
    }

    pub fn index(&self) -> &EventIndex {
        &self.index
    }

    pub fn markers(&self) -> &MarkerSynchronizer {
        &self.markers
    }

    pub fn markers_mut(&mut self) -> &mut MarkerSynchronizer {
        &mut self.markers
    }

    pub fn buildings(&self) -> &BuildingDirectory {
        &self.buildings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingView;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_purge_without_expiry_does_not_touch_view() {
        let view = Arc::new(RecordingView::new());
        let mut layer = EventLayer::new(view.clone());
        layer.apply_snapshot(&[json!({ "id": 1, "building": "B1", "lat": 40.0, "lng": -79.0 })], t0());
        layer.open_building("B1");
        view.clear_ops();

        let report = layer.purge(t0() + Duration::seconds(1), Duration::hours(1));

        assert!(report.is_empty());
        assert!(view.ops().is_empty());
    }

    #[test]
    fn test_purge_rerenders_open_building_with_remaining_events() {
        let view = Arc::new(RecordingView::new());
        let mut layer = EventLayer::new(view.clone());
        layer.apply_snapshot(&[json!({ "id": 1, "building": "B1" })], t0());
        layer.apply_snapshot(
            &[json!({ "id": 1, "building": "B1" }), json!({ "id": 2, "building": "B1" })],
            t0() + Duration::minutes(30),
        );
        layer.open_building("B1");

        let report = layer.purge(t0() + Duration::minutes(61), Duration::hours(1));

        assert_eq!(report.expired, vec![EventKey::server("1")]);
        assert!(report.detail_rerendered);
        assert_eq!(
            view.last_event_list(),
            Some(("Bldg B1".to_string(), vec!["2".to_string()]))
        );
    }

    #[test]
    fn test_ingest_rerenders_open_building() {
        let view = Arc::new(RecordingView::new());
        let mut layer = EventLayer::new(view.clone());
        layer.open_building("B1");
        assert_eq!(view.last_event_list(), Some(("Bldg B1".to_string(), vec![])));

        layer.apply_snapshot(&[json!({ "id": 5, "building": "B1" })], t0());
        assert_eq!(
            view.last_event_list(),
            Some(("Bldg B1".to_string(), vec!["5".to_string()]))
        );
    }

    #[test]
    fn test_redelivered_event_gains_marker_when_coordinates_arrive() {
        let view = Arc::new(RecordingView::new());
        let mut layer = EventLayer::new(view.clone());
        let first = layer.apply_snapshot(&[json!({ "id": 1, "building": "B1" })], t0());
        assert_eq!(first.markers_placed, 0);

        let second = layer.apply_snapshot(
            &[json!({ "id": 1, "building": "B1", "lat": 40.0, "lng": -79.0 })],
            t0() + Duration::minutes(1),
        );

        assert_eq!(second.new_events, 0);
        assert_eq!(second.markers_placed, 1);
        assert_eq!(layer.index().len(), 1);
        assert_eq!(view.live_markers(), 1);
    }

    #[test]
    fn test_late_building_directory_places_waiting_events() {
        let view = Arc::new(RecordingView::new());
        let mut layer = EventLayer::new(view.clone());
        layer.apply_snapshot(&[json!({ "id": 1, "building": "B1" })], t0());
        assert_eq!(view.live_markers(), 0);

        let placed = layer.set_buildings(BuildingDirectory::from_records(&[json!({
            "id": "B1", "name": "Hillman Library", "latitude": 40.44, "longitude": -79.95
        })]));
        assert_eq!(placed, 1);
        assert_eq!(view.live_markers(), 1);

        layer.apply_snapshot(&[json!({ "id": 1, "building": "B1" })], t0() + Duration::minutes(1));
        assert_eq!(view.live_markers(), 1);
    }
}
