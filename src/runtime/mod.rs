//! Stateful side of the map: the shared event layer, the purge timer and the
//! session that wires loaders, selectors and the view together.

mod clock;
mod layer;
mod purge;
mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use layer::{EventLayer, IngestReport, PurgeReport, SharedLayer};
pub use purge::{default_event_ttl, PurgeScheduler, SchedulerError, SchedulerState, PURGE_INTERVAL};
pub use session::MapSession;
