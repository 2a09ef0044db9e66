//! Zonewarden engine library.
//!
//! Bridges a chat platform to a live multiplayer game server whose only
//! API is fire-and-forget text commands out and uncorrelated
//! notifications in.
//!
//! ## Structure
//!
//! - `infrastructure/` - Ports, event correlation, HTTP boundary,
//!   persistence
//! - `stores/` - Durable zone/group/war state behind typed handles
//! - `parse/` - Dialog and chat scraping grammars
//! - `use_cases/` - Pagination walking, tag lookup, war tracking,
//!   reconciliation scanning
//! - `app` - Application composition

pub mod app;
pub mod infrastructure;
pub mod parse;
pub mod settings;
pub mod stores;
pub mod use_cases;

/// Shared test doubles.
#[cfg(test)]
pub mod test_fixtures;

pub use app::App;
