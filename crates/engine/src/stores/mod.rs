//! Persisted store handles.

pub mod state;

pub use state::{open, CaptureOutcome, GroupTagResolver, WarBoard, ZoneStore};
