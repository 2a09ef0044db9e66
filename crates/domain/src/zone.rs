//! Zone ownership and the cooldown/attack-window cycle.
//!
//! Attackability is never stored; it is derived from `captured_at` and the
//! wall clock, which keeps the model restart-safe and immune to missed
//! timers.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ZoneId;

/// World position of a zone's capture point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZonePosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// A capturable territorial unit.
///
/// Zones are created on first position mapping or first capture and never
/// deleted, only reinterpreted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Zone {
    /// Owning group's canonical name; `None` until a capture is seen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Time of the most recent capture or successful defense.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<ZonePosition>,
}

/// Where a zone currently sits in its capture cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZonePhase {
    /// Owner is protected; the attack window opens after `attackable_in`.
    Cooldown { attackable_in: Duration },
    /// The zone may be contested for another `closes_in`.
    Attackable { closes_in: Duration },
}

impl ZonePhase {
    pub fn is_attackable(&self) -> bool {
        matches!(self, ZonePhase::Attackable { .. })
    }
}

/// Cycle durations shared by every zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleConfig {
    pub cooldown: Duration,
    pub attack_window: Duration,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::hours(6),
            attack_window: Duration::hours(1),
        }
    }
}

impl CycleConfig {
    pub fn new(cooldown: Duration, attack_window: Duration) -> Self {
        Self {
            cooldown,
            attack_window,
        }
    }

    /// Full cycle length: cooldown followed by the attack window.
    pub fn period(&self) -> Duration {
        self.cooldown + self.attack_window
    }

    /// Position of a captured zone in its cycle at `now`.
    ///
    /// `elapsed mod period` is in `[0, cooldown)` during protection and in
    /// `[cooldown, period)` while attackable.
    pub fn phase(&self, captured_at: DateTime<Utc>, now: DateTime<Utc>) -> ZonePhase {
        let period = self.period().num_seconds().max(1);
        let cooldown = self.cooldown.num_seconds().min(period);
        // Clock skew can put a capture in the future; read it as a cycle
        // that just started.
        let elapsed = (now - captured_at).num_seconds().max(0);
        let pos = elapsed.rem_euclid(period);
        if pos < cooldown {
            ZonePhase::Cooldown {
                attackable_in: Duration::seconds(cooldown - pos),
            }
        } else {
            ZonePhase::Attackable {
                closes_in: Duration::seconds(period - pos),
            }
        }
    }

    /// Invert a server-reported "attackable in" remainder into the capture
    /// time it implies. Used by reconciliation to compare against the
    /// stored `captured_at`.
    pub fn captured_at_implied_by(
        &self,
        attackable_in: Duration,
        now: DateTime<Utc>,
    ) -> DateTime<Utc> {
        now + attackable_in - self.cooldown
    }
}

impl Zone {
    /// Phase of this zone, or `None` when no capture has been recorded.
    pub fn phase(&self, cycle: &CycleConfig, now: DateTime<Utc>) -> Option<ZonePhase> {
        self.captured_at.map(|t| cycle.phase(t, now))
    }

    /// A zone with no recorded capture is open to attack.
    pub fn is_attackable(&self, cycle: &CycleConfig, now: DateTime<Utc>) -> bool {
        match self.captured_at {
            None => true,
            Some(t) => cycle.phase(t, now).is_attackable(),
        }
    }
}

/// A zone paired with its id, for ordered work queues.
#[derive(Debug, Clone)]
pub struct ZoneEntry {
    pub id: ZoneId,
    pub zone: Zone,
}
