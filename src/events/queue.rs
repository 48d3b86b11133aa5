use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use super::types::{Event, EventKey};

/// Arrival-ordered events for one building.
///
/// The head is always the oldest entry. Callers push in non-decreasing
/// `received_at` order, which lets expiry stop at the first young head.
#[derive(Debug, Clone, Default)]
pub struct BuildingEventQueue {
    entries: VecDeque<Event>,
}

impl BuildingEventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a queue from arbitrary events, stably ordered by `received_at`.
    pub fn from_events(mut events: Vec<Event>) -> Self {
        events.sort_by_key(|event| event.received_at);
        Self {
            entries: events.into(),
        }
    }

    pub fn push(&mut self, event: Event) {
        debug_assert!(
            self.entries
                .back()
                .map_or(true, |last| last.received_at <= event.received_at),
            "queue push out of arrival order"
        );
        self.entries.push_back(event);
    }

    /// Pop from the head while the head is older than `ttl`.
    pub fn pop_expired(&mut self, now: DateTime<Utc>, ttl: chrono::Duration) -> Vec<Event> {
        let mut expired = Vec::new();
        while let Some(head) = self.entries.front() {
            if head.age_at(now) <= ttl {
                break;
            }
            if let Some(event) = self.entries.pop_front() {
                expired.push(event);
            }
        }
        expired
    }

    pub fn head(&self) -> Option<&Event> {
        self.entries.front()
    }

    pub fn contains(&self, key: &EventKey) -> bool {
        self.entries.iter().any(|event| &event.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.entries.iter()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = Event> + '_ {
        self.entries.drain(..)
    }

    pub fn snapshot(&self) -> Vec<Event> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when every adjacent pair is in arrival order.
    pub fn is_arrival_ordered(&self) -> bool {
        self.entries
            .iter()
            .zip(self.entries.iter().skip(1))
            .all(|(a, b)| a.received_at <= b.received_at)
    }
}
