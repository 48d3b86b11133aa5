use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::queue::BuildingEventQueue;
use super::types::{Event, EventKey};

/// Per-building, arrival-ordered index of live events.
///
/// Each ingestion rebuilds the queues from the new snapshot. Two things
/// survive a rebuild: the `received_at` of any key the index already holds,
/// and events the snapshot no longer mentions. The latter leave only through
/// [`EventIndex::expire`].
#[derive(Debug, Default)]
pub struct EventIndex {
    queues: BTreeMap<String, BuildingEventQueue>,
    unassigned: BuildingEventQueue,
    received: HashMap<EventKey, DateTime<Utc>>,
}

impl EventIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&mut self, records: &[Value]) -> Vec<Event> {
        self.ingest_at(records, Utc::now())
    }

    /// Apply one snapshot and return the events that were not already in the
    /// index, in snapshot order.
    pub fn ingest_at(&mut self, records: &[Value], now: DateTime<Utc>) -> Vec<Event> {
        let mut snapshot: Vec<Event> = Vec::with_capacity(records.len());
        let mut positions: HashMap<EventKey, usize> = HashMap::new();
        let mut skipped = 0usize;

        for record in records {
            let Some(mut event) = Event::from_record(record, now) else {
                skipped += 1;
                continue;
            };
            if let Some(received_at) = self.received.get(&event.key) {
                event.received_at = *received_at;
            }
            match positions.get(&event.key) {
                Some(&slot) => snapshot[slot] = event,
                None => {
                    positions.insert(event.key.clone(), snapshot.len());
                    snapshot.push(event);
                }
            }
        }

        if skipped > 0 {
            tracing::warn!("skipped {skipped} event records that were not JSON objects");
        }

        let fresh: Vec<Event> = snapshot
            .iter()
            .filter(|event| !self.received.contains_key(&event.key))
            .cloned()
            .collect();

        // Events the snapshot dropped stay put until they expire.
        let mut grouped: BTreeMap<Option<String>, Vec<Event>> = BTreeMap::new();
        let previous = std::mem::take(&mut self.queues);
        let carried = previous
            .into_values()
            .flat_map(|mut queue| queue.drain().collect::<Vec<_>>())
            .chain(self.unassigned.drain().collect::<Vec<_>>())
            .filter(|event| !positions.contains_key(&event.key));
        let mut retained = 0usize;
        for event in carried {
            retained += 1;
            grouped
                .entry(event.building_id.clone())
                .or_default()
                .push(event);
        }
        for event in snapshot {
            grouped
                .entry(event.building_id.clone())
                .or_default()
                .push(event);
        }

        self.received.clear();
        for (building_id, events) in grouped {
            for event in &events {
                self.received.insert(event.key.clone(), event.received_at);
            }
            let queue = BuildingEventQueue::from_events(events);
            match building_id {
                Some(id) => {
                    self.queues.insert(id, queue);
                }
                None => self.unassigned = queue,
            }
        }

        tracing::debug!(
            total = self.received.len(),
            new = fresh.len(),
            retained,
            buildings = self.queues.len(),
            "ingested event snapshot"
        );
        fresh
    }

    /// Evict every event older than `ttl` and return them oldest first.
    pub fn expire(&mut self, now: DateTime<Utc>, ttl: chrono::Duration) -> Vec<Event> {
        let mut expired = Vec::new();
        let mut emptied = Vec::new();

        for (building_id, queue) in self.queues.iter_mut() {
            expired.extend(queue.pop_expired(now, ttl));
            if queue.is_empty() {
                emptied.push(building_id.clone());
            }
        }
        expired.extend(self.unassigned.pop_expired(now, ttl));

        for building_id in emptied {
            self.queues.remove(&building_id);
        }
        for event in &expired {
            self.received.remove(&event.key);
        }
        expired.sort_by_key(|event| event.received_at);

        if !expired.is_empty() {
            tracing::debug!(
                expired = expired.len(),
                remaining = self.received.len(),
                "expired stale events"
            );
        }
        expired
    }

    pub fn list_for_building(&self, building_id: &str) -> Vec<Event> {
        self.queues
            .get(building_id)
            .map(BuildingEventQueue::snapshot)
            .unwrap_or_default()
    }

    /// Events with no building id, oldest first.
    pub fn unassigned(&self) -> Vec<Event> {
        self.unassigned.snapshot()
    }

    /// Every live event: building queues in id order, then the unassigned
    /// queue, each oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.queues
            .values()
            .chain(std::iter::once(&self.unassigned))
            .flat_map(|queue| queue.iter())
    }

    pub fn building_ids(&self) -> impl Iterator<Item = &str> {
        self.queues.keys().map(String::as_str)
    }

    pub fn has_queue(&self, building_id: &str) -> bool {
        self.queues.contains_key(building_id)
    }

    pub fn contains(&self, key: &EventKey) -> bool {
        self.received.contains_key(key)
    }

    pub fn received_at(&self, key: &EventKey) -> Option<DateTime<Utc>> {
        self.received.get(key).copied()
    }

    pub fn keys(&self) -> HashSet<EventKey> {
        self.received.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.received.len()
    }

    pub fn is_empty(&self) -> bool {
        self.received.is_empty()
    }

    /// True when every queue holds its events in arrival order.
    pub fn is_arrival_ordered(&self) -> bool {
        self.queues
            .values()
            .chain(std::iter::once(&self.unassigned))
            .all(BuildingEventQueue::is_arrival_ordered)
    }
}
