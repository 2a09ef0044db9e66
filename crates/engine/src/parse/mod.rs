//! Scraping layer for free-text game payloads.
//!
//! Kept apart from correlation and reconciliation control flow so grammar
//! changes never touch those.

pub mod chat;
pub mod markup;
pub mod rows;
pub mod zone_info;
