//! A `MapView` that keeps what it was asked to show.

use std::collections::BTreeMap;
use std::sync::Mutex;

use campus_map::events::{Coordinates, Event};
use campus_map::view::{MapView, MarkerHandle, OptionList, PopupContent, RouteHandle, SelectorSide};

#[derive(Debug, Default)]
struct State {
    next: u64,
    markers: BTreeMap<u64, String>,
    options: BTreeMap<&'static str, OptionList>,
    listing: Option<(String, Vec<String>)>,
    errors: Vec<String>,
    routes: Vec<Vec<Coordinates>>,
    cleared_routes: Vec<RouteHandle>,
}

#[derive(Debug, Default)]
pub struct MockView {
    state: Mutex<State>,
}

impl MockView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Titles of markers currently on the map, in creation order.
    pub fn marker_titles(&self) -> Vec<String> {
        self.state.lock().unwrap().markers.values().cloned().collect()
    }

    pub fn options(&self, side: SelectorSide) -> Option<OptionList> {
        self.state.lock().unwrap().options.get(side_key(side)).cloned()
    }

    pub fn listing(&self) -> Option<(String, Vec<String>)> {
        self.state.lock().unwrap().listing.clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.state.lock().unwrap().errors.clone()
    }

    pub fn routes(&self) -> Vec<Vec<Coordinates>> {
        self.state.lock().unwrap().routes.clone()
    }

    pub fn cleared_routes(&self) -> usize {
        self.state.lock().unwrap().cleared_routes.len()
    }
}

fn side_key(side: SelectorSide) -> &'static str {
    match side {
        SelectorSide::Start => "start",
        SelectorSide::End => "end",
    }
}

impl MapView for MockView {
    fn create_marker(&self, _at: Coordinates, label: &str, _popup: &PopupContent) -> MarkerHandle {
        let mut state = self.state.lock().unwrap();
        state.next += 1;
        let id = state.next;
        state.markers.insert(id, label.to_string());
        MarkerHandle(id)
    }

    fn remove_marker(&self, handle: MarkerHandle) {
        self.state.lock().unwrap().markers.remove(&handle.0);
    }

    fn render_building_options(&self, side: SelectorSide, options: &OptionList) {
        self.state
            .lock()
            .unwrap()
            .options
            .insert(side_key(side), options.clone());
    }

    fn render_event_list(&self, building_label: &str, events: &[Event]) {
        self.state.lock().unwrap().listing = Some((
            building_label.to_string(),
            events.iter().map(|event| event.name.clone()).collect(),
        ));
    }

    fn show_error(&self, message: &str) {
        self.state.lock().unwrap().errors.push(message.to_string());
    }

    fn draw_route(&self, path: &[Coordinates]) -> RouteHandle {
        let mut state = self.state.lock().unwrap();
        state.next += 1;
        state.routes.push(path.to_vec());
        RouteHandle(state.next)
    }

    fn clear_route(&self, handle: RouteHandle) {
        self.state.lock().unwrap().cleared_routes.push(handle);
    }
}
