//! Mirrors live events onto the view's marker layer.
//!
//! `MarkerSynchronizer` is the only component that asks the view to add or
//! remove markers. It never touches the event index; it reconciles against
//! the live events the index exposes and the expired lists it hands back.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::buildings::BuildingDirectory;
use crate::events::{Coordinates, Event, EventKey};
use crate::view::{MapView, MarkerHandle, PopupContent};

/// What a placed marker currently shows.
#[derive(Debug, Clone, PartialEq)]
struct Binding {
    handle: MarkerHandle,
    at: Coordinates,
    popup: PopupContent,
}

pub struct MarkerSynchronizer {
    view: Arc<dyn MapView>,
    bindings: HashMap<EventKey, Binding>,
    custom: Vec<MarkerHandle>,
}

impl MarkerSynchronizer {
    pub fn new(view: Arc<dyn MapView>) -> Self {
        Self {
            view,
            bindings: HashMap::new(),
            custom: Vec::new(),
        }
    }

    /// Bring the marker set in line with `live`. Returns how many markers
    /// were created, counting re-placements.
    ///
    /// An event without its own coordinates falls back to its building's.
    /// A bound event whose position or popup changed is re-placed; one that
    /// no longer resolves to a position loses its marker. Bindings for keys
    /// absent from `live` are dropped.
    pub fn reconcile<'a>(
        &mut self,
        live: impl IntoIterator<Item = &'a Event>,
        buildings: &BuildingDirectory,
    ) -> usize {
        let mut placed = 0usize;
        let mut seen: HashSet<EventKey> = HashSet::new();

        for event in live {
            seen.insert(event.key.clone());
            let wanted = resolve(event, buildings);
            if let (Some(bound), Some((at, popup))) =
                (self.bindings.get(&event.key), wanted.as_ref())
            {
                if bound.at == *at && bound.popup == *popup {
                    continue;
                }
            }
            if let Some(stale) = self.bindings.remove(&event.key) {
                self.view.remove_marker(stale.handle);
                tracing::debug!(key = %event.key, "event marker changed; re-placing");
            }
            let Some((at, popup)) = wanted else {
                tracing::debug!(key = %event.key, "event has no coordinates; no marker placed");
                continue;
            };
            let handle = self.view.create_marker(at, &event.name, &popup);
            self.bindings
                .insert(event.key.clone(), Binding { handle, at, popup });
            placed += 1;
        }

        let orphaned: Vec<EventKey> = self
            .bindings
            .keys()
            .filter(|key| !seen.contains(*key))
            .cloned()
            .collect();
        for key in orphaned {
            if let Some(binding) = self.bindings.remove(&key) {
                self.view.remove_marker(binding.handle);
            }
        }
        placed
    }

    /// Remove markers for expired events, in the order given. Keys with no
    /// bound marker are skipped, so repeated removal is harmless.
    pub fn remove(&mut self, events: &[Event]) -> usize {
        let mut removed = 0usize;
        for event in events {
            match self.bindings.remove(&event.key) {
                Some(binding) => {
                    self.view.remove_marker(binding.handle);
                    removed += 1;
                }
                None => tracing::debug!(key = %event.key, "no marker bound; removal skipped"),
            }
        }
        removed
    }

    /// Place a user-dropped marker that is not tied to any event.
    pub fn place_custom(&mut self, at: Coordinates, title: &str, description: &str) -> MarkerHandle {
        let popup = PopupContent {
            title: title.to_string(),
            description: description.to_string(),
            ..PopupContent::default()
        };
        let handle = self.view.create_marker(at, title, &popup);
        self.custom.push(handle);
        handle
    }

    pub fn handle_for(&self, key: &EventKey) -> Option<MarkerHandle> {
        self.bindings.get(key).map(|binding| binding.handle)
    }

    pub fn bound_count(&self) -> usize {
        self.bindings.len()
    }

    pub fn custom_count(&self) -> usize {
        self.custom.len()
    }

    /// Remove every marker this synchronizer placed.
    pub fn clear(&mut self) {
        for (_, binding) in self.bindings.drain() {
            self.view.remove_marker(binding.handle);
        }
        for handle in self.custom.drain(..) {
            self.view.remove_marker(handle);
        }
    }
}

/// Where an event's marker belongs and what its popup says.
fn resolve(event: &Event, buildings: &BuildingDirectory) -> Option<(Coordinates, PopupContent)> {
    let at = event.coordinates.or_else(|| {
        event
            .building_id
            .as_deref()
            .and_then(|id| buildings.coordinates_for(id))
    })?;
    let popup = PopupContent {
        title: event.name.clone(),
        organization: event.organization.clone(),
        time_label: event.time_label.clone(),
        description: event.description.clone(),
        building_label: event
            .building_id
            .as_deref()
            .map(|id| buildings.label_for(id)),
    };
    Some((at, popup))
}
