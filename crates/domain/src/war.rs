//! Active zone contests between two groups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One side's view of an active war. Stored symmetrically for both
/// participants; a group is in at most one war at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarStatus {
    pub opponent: String,
    pub started_at: DateTime<Utc>,
}

/// How a war ended, as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarOutcome {
    /// The attacker captured the zone; ownership changes.
    TakesOver,
    /// The defender held the zone; ownership stays, the cycle restarts.
    Keeps,
}

impl WarOutcome {
    pub fn display_name(&self) -> &'static str {
        match self {
            WarOutcome::TakesOver => "takes over",
            WarOutcome::Keeps => "keeps",
        }
    }
}

impl std::fmt::Display for WarOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
