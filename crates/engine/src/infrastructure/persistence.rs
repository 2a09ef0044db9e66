//! JSON document persistence.
//!
//! State lives in two independent documents: one for zone/group/war state
//! and one for zone geographic positions. Both are loaded wholesale at
//! startup and rewritten wholesale after every mutation; a failed write
//! leaves the last durable value on disk.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use zonewarden_domain::{Group, WarStatus, Zone, ZoneId, ZonePosition};

use crate::infrastructure::ports::StoreError;

/// The zone/group/war document.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct StateDocument {
    #[serde(default)]
    pub zones: BTreeMap<ZoneId, Zone>,
    /// Group tags and zone membership, keyed by canonical group name.
    #[serde(default)]
    pub groups: BTreeMap<String, Group>,
    /// Symmetric active-war pairings, keyed by group name.
    #[serde(default)]
    pub active_wars: BTreeMap<String, WarStatus>,
    /// Player -> group tag the player has locked their attacks onto.
    #[serde(default)]
    pub locked_attacks: BTreeMap<String, String>,
    /// Per-group rotation position for attack-target cycling.
    #[serde(default)]
    pub attack_rotation: BTreeMap<String, usize>,
}

/// The zone-position document: zone id -> capture point.
pub type PositionsDocument = BTreeMap<ZoneId, ZonePosition>;

/// One wholesale-rewritten JSON file.
pub struct JsonDocumentFile {
    path: PathBuf,
}

impl JsonDocumentFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document, or its default when the file does not exist yet.
    pub fn load_or_default<T>(&self) -> Result<T, StoreError>
    where
        T: DeserializeOwned + Default,
    {
        if !self.path.exists() {
            return Ok(T::default());
        }
        let bytes = fs::read(&self.path)
            .map_err(|e| StoreError::persistence(self.path.display().to_string(), e))?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Rewrite the whole document. Writes a sibling temp file first so a
    /// failure cannot leave a half-written document behind.
    pub fn store<T: Serialize>(&self, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(value)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| StoreError::persistence(parent.display().to_string(), e))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &json)
            .map_err(|e| StoreError::persistence(tmp.display().to_string(), e))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| StoreError::persistence(self.path.display().to_string(), e))?;
        Ok(())
    }
}
