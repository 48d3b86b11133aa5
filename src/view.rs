//! The visual collaborator.
//!
//! The core never draws anything itself. It hands `MapView` marker, listing,
//! selector and route instructions and keeps only the opaque handles it gets
//! back.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::events::{Coordinates, Event};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarkerHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteHandle(pub u64);

/// Popup body attached to an event or custom marker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupContent {
    pub title: String,
    pub organization: Option<String>,
    pub time_label: Option<String>,
    pub description: String,
    pub building_label: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorSide {
    Start,
    End,
}

impl SelectorSide {
    pub const fn placeholder(&self) -> &'static str {
        match self {
            Self::Start => "-- Select start --",
            Self::End => "-- Select end --",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

/// A fully rendered selector. `selected == None` means the placeholder is
/// the active entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionList {
    pub placeholder: String,
    pub options: Vec<SelectOption>,
    pub selected: Option<String>,
    pub disabled: bool,
}

pub trait MapView: Send + Sync {
    fn create_marker(&self, at: Coordinates, label: &str, popup: &PopupContent) -> MarkerHandle;
    /// Must tolerate handles that are already gone.
    fn remove_marker(&self, handle: MarkerHandle);
    fn render_building_options(&self, side: SelectorSide, options: &OptionList);
    fn render_event_list(&self, building_label: &str, events: &[Event]);
    fn show_error(&self, message: &str);
    fn draw_route(&self, path: &[Coordinates]) -> RouteHandle;
    fn clear_route(&self, handle: RouteHandle);
}

/// Headless view that logs every instruction.
///
/// Used by the replay binary and anywhere a real map surface is absent.
#[derive(Debug, Default)]
pub struct TracingView {
    next_handle: AtomicU64,
    markers: DashMap<MarkerHandle, String>,
}

impl TracingView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_markers(&self) -> usize {
        self.markers.len()
    }

    fn next(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl MapView for TracingView {
    fn create_marker(&self, at: Coordinates, label: &str, popup: &PopupContent) -> MarkerHandle {
        let handle = MarkerHandle(self.next());
        tracing::info!(
            handle = handle.0,
            lat = at.latitude,
            lng = at.longitude,
            time = popup.time_label.as_deref().unwrap_or(""),
            "marker added: {label}"
        );
        self.markers.insert(handle, label.to_string());
        handle
    }

    fn remove_marker(&self, handle: MarkerHandle) {
        match self.markers.remove(&handle) {
            Some((_, label)) => tracing::info!(handle = handle.0, "marker removed: {label}"),
            None => tracing::debug!(handle = handle.0, "marker already absent"),
        }
    }

    fn render_building_options(&self, side: SelectorSide, options: &OptionList) {
        tracing::info!(
            ?side,
            options = options.options.len(),
            selected = options.selected.as_deref().unwrap_or("<placeholder>"),
            disabled = options.disabled,
            "building options rendered"
        );
    }

    fn render_event_list(&self, building_label: &str, events: &[Event]) {
        tracing::info!("{building_label}: {} event(s)", events.len());
        for event in events {
            tracing::info!(
                key = %event.key,
                received_at = %event.received_at.to_rfc3339(),
                "  {} ({})",
                event.name,
                event.time_label.as_deref().unwrap_or("time tbd")
            );
        }
    }

    fn show_error(&self, message: &str) {
        tracing::error!("{message}");
    }

    fn draw_route(&self, path: &[Coordinates]) -> RouteHandle {
        let handle = RouteHandle(self.next());
        tracing::info!(handle = handle.0, stops = path.len(), "route drawn");
        handle
    }

    fn clear_route(&self, handle: RouteHandle) {
        tracing::info!(handle = handle.0, "route cleared");
    }
}
