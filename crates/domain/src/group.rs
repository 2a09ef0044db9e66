//! Player factions.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ids::ZoneId;

/// A faction with a canonical display name and an optional short tag.
///
/// Names are case-preserving and unique; tags are unique case-insensitively
/// (collision handling lives in the tag resolver, not here).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Group {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub owned_zones: BTreeSet<ZoneId>,
}

impl Group {
    pub fn with_tag(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            owned_zones: BTreeSet::new(),
        }
    }

    pub fn add_zone(&mut self, zone: ZoneId) -> bool {
        self.owned_zones.insert(zone)
    }

    pub fn remove_zone(&mut self, zone: ZoneId) -> bool {
        self.owned_zones.remove(&zone)
    }

    pub fn owns(&self, zone: ZoneId) -> bool {
        self.owned_zones.contains(&zone)
    }
}
