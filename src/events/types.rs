use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Field aliases accepted on incoming event records
// ---------------------------------------------------------------------------

const ID_FIELDS: &[&str] = &["id", "event_id"];
pub const BUILDING_ID_FIELDS: &[&str] = &[
    "building_id",
    "building_rowid",
    "buildingId",
    "building",
    "bldg_id",
];
const NAME_FIELDS: &[&str] = &["name", "title", "event_name"];
const DESCRIPTION_FIELDS: &[&str] = &["description", "details"];
const TIME_FIELDS: &[&str] = &["time", "time_label", "start_time", "when"];
const ORGANIZATION_FIELDS: &[&str] = &["organization", "org"];
const LATITUDE_FIELDS: &[&str] = &["latitude", "lat"];
const LONGITUDE_FIELDS: &[&str] = &["longitude", "lng", "lon"];

pub const UNTITLED_EVENT: &str = "Untitled event";

/// Stable identity of an event for the lifetime of the session.
///
/// Server ids are stringified as-is; records without one get a generated
/// `local-` key that never collides with a server id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventKey(String);

impl EventKey {
    pub fn server(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generated() -> Self {
        Self(format!("local-{}", Uuid::new_v4()))
    }

    pub fn is_generated(&self) -> bool {
        self.0.starts_with("local-")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EventKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Returns `None` for non-finite or out-of-range pairs.
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return None;
        }
        Some(Self {
            latitude,
            longitude,
        })
    }

    /// Reads a coordinate pair from any of the loose latitude/longitude
    /// spellings. Values may be JSON numbers or numeric strings.
    pub fn from_record(record: &Value) -> Option<Self> {
        let latitude = first_number(record, LATITUDE_FIELDS)?;
        let longitude = first_number(record, LONGITUDE_FIELDS)?;
        Self::new(latitude, longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub key: EventKey,
    pub building_id: Option<String>,
    pub name: String,
    pub description: String,
    pub time_label: Option<String>,
    pub organization: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub received_at: DateTime<Utc>,
}

impl Event {
    /// Parse one loosely-shaped event record.
    ///
    /// Returns `None` only when the record is not a JSON object. Missing
    /// fields degrade to defaults; a missing building id leaves the event
    /// unassigned rather than rejecting it.
    pub fn from_record(record: &Value, received_at: DateTime<Utc>) -> Option<Self> {
        if !record.is_object() {
            return None;
        }

        let key = first_identifier(record, ID_FIELDS)
            .map(EventKey::server)
            .unwrap_or_else(EventKey::generated);

        Some(Self {
            key,
            building_id: first_identifier(record, BUILDING_ID_FIELDS),
            name: first_text(record, NAME_FIELDS).unwrap_or_else(|| UNTITLED_EVENT.to_string()),
            description: first_text(record, DESCRIPTION_FIELDS).unwrap_or_default(),
            time_label: first_text(record, TIME_FIELDS),
            organization: first_text(record, ORGANIZATION_FIELDS),
            coordinates: Coordinates::from_record(record),
            received_at,
        })
    }

    pub fn age_at(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.received_at
    }
}

// ---------------------------------------------------------------------------
// Loose field helpers (shared with building records)
// ---------------------------------------------------------------------------

/// First non-empty identifier under any alias. Integers and strings are
/// both accepted; floats with no fractional part are treated as integers.
pub(crate) fn first_identifier(record: &Value, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| match record.get(*field)? {
        Value::String(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                Some(int.to_string())
            } else if let Some(uint) = number.as_u64() {
                Some(uint.to_string())
            } else {
                number
                    .as_f64()
                    .filter(|value| value.fract() == 0.0 && value.is_finite())
                    .map(|value| format!("{value:.0}"))
            }
        }
        _ => None,
    })
}

pub(crate) fn first_text(record: &Value, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| {
        let text = record.get(*field)?.as_str()?.trim();
        (!text.is_empty()).then(|| text.to_string())
    })
}

pub(crate) fn first_number(record: &Value, fields: &[&str]) -> Option<f64> {
    fields.iter().find_map(|field| match record.get(*field)? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    })
}
