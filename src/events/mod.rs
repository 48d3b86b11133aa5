//! Event lifecycle index.
//!
//! Events arrive as loosely-shaped JSON snapshots from the event loader and
//! are grouped per building in arrival order:
//! - `types`: `Event`, `EventKey`, `Coordinates` and record parsing
//! - `queue`: `BuildingEventQueue`, a head-poppable FIFO per building
//! - `index`: `EventIndex`, snapshot ingestion and TTL expiry

mod index;
mod queue;
mod types;

pub use index::EventIndex;
pub use queue::BuildingEventQueue;
pub use types::{Coordinates, Event, EventKey, BUILDING_ID_FIELDS, UNTITLED_EVENT};

pub(crate) use types::{first_identifier, first_number, first_text};
