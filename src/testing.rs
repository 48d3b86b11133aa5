//! Test doubles shared by unit tests and the scenario suite.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::events::{Coordinates, Event};
use crate::source::{BuildingSource, EventSource, RouteResponse, RouteSource, SourceError};
use crate::view::{MapView, MarkerHandle, OptionList, PopupContent, RouteHandle, SelectorSide};

/// Every instruction a `RecordingView` received, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewOp {
    CreateMarker {
        handle: MarkerHandle,
        at: Coordinates,
        label: String,
        popup: PopupContent,
    },
    RemoveMarker(MarkerHandle),
    RenderOptions(SelectorSide, OptionList),
    RenderEvents {
        building_label: String,
        keys: Vec<String>,
    },
    Error(String),
    DrawRoute(RouteHandle, Vec<Coordinates>),
    ClearRoute(RouteHandle),
}

#[derive(Debug, Default)]
struct Recorded {
    ops: Vec<ViewOp>,
    live: HashSet<MarkerHandle>,
    next: u64,
}

#[derive(Debug, Default)]
pub struct RecordingView {
    inner: Mutex<Recorded>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> Vec<ViewOp> {
        self.inner.lock().unwrap().ops.clone()
    }

    pub fn live_markers(&self) -> usize {
        self.inner.lock().unwrap().live.len()
    }

    pub fn created(&self) -> Vec<(Coordinates, PopupContent)> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                ViewOp::CreateMarker { at, popup, .. } => Some((at, popup)),
                _ => None,
            })
            .collect()
    }

    /// Labels of removed markers, in removal order.
    pub fn removed_labels(&self) -> Vec<String> {
        let ops = self.ops();
        ops.iter()
            .filter_map(|op| match op {
                ViewOp::RemoveMarker(removed) => ops.iter().find_map(|candidate| match candidate {
                    ViewOp::CreateMarker { handle, label, .. } if handle == removed => {
                        Some(label.clone())
                    }
                    _ => None,
                }),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                ViewOp::Error(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn last_options(&self, side: SelectorSide) -> Option<OptionList> {
        self.ops().into_iter().rev().find_map(|op| match op {
            ViewOp::RenderOptions(rendered, list) if rendered == side => Some(list),
            _ => None,
        })
    }

    pub fn last_event_list(&self) -> Option<(String, Vec<String>)> {
        self.ops().into_iter().rev().find_map(|op| match op {
            ViewOp::RenderEvents {
                building_label,
                keys,
            } => Some((building_label, keys)),
            _ => None,
        })
    }

    pub fn clear_ops(&self) {
        self.inner.lock().unwrap().ops.clear();
    }
}

impl MapView for RecordingView {
    fn create_marker(&self, at: Coordinates, label: &str, popup: &PopupContent) -> MarkerHandle {
        let mut inner = self.inner.lock().unwrap();
        inner.next += 1;
        let handle = MarkerHandle(inner.next);
        inner.live.insert(handle);
        inner.ops.push(ViewOp::CreateMarker {
            handle,
            at,
            label: label.to_string(),
            popup: popup.clone(),
        });
        handle
    }

    fn remove_marker(&self, handle: MarkerHandle) {
        let mut inner = self.inner.lock().unwrap();
        inner.live.remove(&handle);
        inner.ops.push(ViewOp::RemoveMarker(handle));
    }

    fn render_building_options(&self, side: SelectorSide, options: &OptionList) {
        self.inner
            .lock()
            .unwrap()
            .ops
            .push(ViewOp::RenderOptions(side, options.clone()));
    }

    fn render_event_list(&self, building_label: &str, events: &[Event]) {
        self.inner.lock().unwrap().ops.push(ViewOp::RenderEvents {
            building_label: building_label.to_string(),
            keys: events.iter().map(|e| e.key.to_string()).collect(),
        });
    }

    fn show_error(&self, message: &str) {
        self.inner
            .lock()
            .unwrap()
            .ops
            .push(ViewOp::Error(message.to_string()));
    }

    fn draw_route(&self, path: &[Coordinates]) -> RouteHandle {
        let mut inner = self.inner.lock().unwrap();
        inner.next += 1;
        let handle = RouteHandle(inner.next);
        inner.ops.push(ViewOp::DrawRoute(handle, path.to_vec()));
        handle
    }

    fn clear_route(&self, handle: RouteHandle) {
        self.inner.lock().unwrap().ops.push(ViewOp::ClearRoute(handle));
    }
}

/// Scripted loader: hands out queued responses and errors with
/// `SourceError::Request` once the script runs dry.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    events: Mutex<Vec<Result<Vec<Value>, SourceError>>>,
    buildings: Mutex<Vec<Result<Vec<Value>, SourceError>>>,
    routes: Mutex<Vec<Result<RouteResponse, SourceError>>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_events(&self, response: Result<Vec<Value>, SourceError>) {
        self.events.lock().unwrap().insert(0, response);
    }

    pub fn push_buildings(&self, response: Result<Vec<Value>, SourceError>) {
        self.buildings.lock().unwrap().insert(0, response);
    }

    pub fn push_route(&self, response: Result<RouteResponse, SourceError>) {
        self.routes.lock().unwrap().insert(0, response);
    }
}

fn exhausted() -> SourceError {
    SourceError::Request("scripted source exhausted".to_string())
}

#[async_trait]
impl EventSource for ScriptedSource {
    async fn fetch_events(&self) -> Result<Vec<Value>, SourceError> {
        self.events.lock().unwrap().pop().unwrap_or_else(|| Err(exhausted()))
    }
}

#[async_trait]
impl BuildingSource for ScriptedSource {
    async fn fetch_buildings(&self) -> Result<Vec<Value>, SourceError> {
        self.buildings.lock().unwrap().pop().unwrap_or_else(|| Err(exhausted()))
    }
}

#[async_trait]
impl RouteSource for ScriptedSource {
    async fn fetch_route(&self, _start: &str, _end: &str) -> Result<RouteResponse, SourceError> {
        self.routes.lock().unwrap().pop().unwrap_or_else(|| Err(exhausted()))
    }
}
