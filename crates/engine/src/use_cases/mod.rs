//! Flows built on the correlator and the stores.

pub mod countdown;
pub mod roster;
pub mod scanner;
pub mod tag_lookup;
pub mod walker;
pub mod war_tracker;
