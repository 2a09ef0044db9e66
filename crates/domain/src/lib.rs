//! Zonewarden domain types.
//!
//! Pure data and invariants: zone cycle math, groups and tags, war
//! pairings, and the inbound notification shapes. No I/O, no clocks, no
//! transport — the engine crate injects all of that.

pub mod dialog;
pub mod events;
pub mod ids;
pub mod war;
pub mod zone;

mod group;

pub use dialog::DialogPage;
pub use events::{ChatLineEvent, DialogEvent, EventKind, GameEvent, TextOverlayEvent};
pub use group::Group;
pub use ids::{DialogId, OverlayId, ZoneId};
pub use war::{WarOutcome, WarStatus};
pub use zone::{CycleConfig, Zone, ZoneEntry, ZonePhase, ZonePosition};
