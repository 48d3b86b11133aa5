//! Cached building list used by the route selectors and marker placement.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::events::{first_identifier, first_text, Coordinates};

const ID_FIELDS: &[&str] = &["id", "rowid"];
const LABEL_FIELDS: &[&str] = &["Building_Name", "BuildingName", "name", "Abbr"];
const NUMBER_FIELDS: &[&str] = &["BldgNo", "bldg_no", "number"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingRecord {
    pub id: String,
    pub label: String,
    pub coordinates: Option<Coordinates>,
}

impl BuildingRecord {
    /// Parse a building row. Rows without an id cannot be selected and are
    /// rejected.
    pub fn from_record(record: &Value) -> Option<Self> {
        let id = first_identifier(record, ID_FIELDS)?;
        let label = first_text(record, LABEL_FIELDS).unwrap_or_else(|| {
            let number = first_identifier(record, NUMBER_FIELDS).unwrap_or_else(|| id.clone());
            fallback_label(&number)
        });
        Some(Self {
            id,
            label,
            coordinates: Coordinates::from_record(record),
        })
    }
}

pub fn fallback_label(number: &str) -> String {
    format!("Bldg {number}")
}

/// Ordered building list with id lookup.
#[derive(Debug, Clone, Default)]
pub struct BuildingDirectory {
    records: Vec<BuildingRecord>,
    by_id: HashMap<String, usize>,
}

impl BuildingDirectory {
    pub fn new(records: Vec<BuildingRecord>) -> Self {
        let mut directory = Self::default();
        for record in records {
            if directory.by_id.contains_key(&record.id) {
                tracing::debug!(building_id = %record.id, "ignoring duplicate building row");
                continue;
            }
            directory
                .by_id
                .insert(record.id.clone(), directory.records.len());
            directory.records.push(record);
        }
        directory
    }

    pub fn from_records(rows: &[Value]) -> Self {
        let parsed: Vec<BuildingRecord> = rows.iter().filter_map(BuildingRecord::from_record).collect();
        let skipped = rows.len() - parsed.len();
        if skipped > 0 {
            tracing::warn!("skipped {skipped} building rows without an id");
        }
        Self::new(parsed)
    }

    pub fn get(&self, id: &str) -> Option<&BuildingRecord> {
        self.by_id.get(id).map(|&idx| &self.records[idx])
    }

    /// Display label for a building id, synthesizing one for unknown ids.
    pub fn label_for(&self, id: &str) -> String {
        self.get(id)
            .map(|record| record.label.clone())
            .unwrap_or_else(|| fallback_label(id))
    }

    pub fn coordinates_for(&self, id: &str) -> Option<Coordinates> {
        self.get(id).and_then(|record| record.coordinates)
    }

    pub fn records(&self) -> &[BuildingRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
