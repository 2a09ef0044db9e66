//! War status tracking from chat-log lines.
//!
//! The chat log is the only push-style source of capture events, and it
//! is best-effort: lines can be missed entirely, which is why the
//! reconciliation scanner exists. What does arrive is applied here.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use zonewarden_domain::{WarOutcome, ZoneId};

use crate::infrastructure::correlator::Correlator;
use crate::infrastructure::ports::ClockPort;
use crate::parse::chat::{parse_war_line, WarLine};
use crate::stores::{GroupTagResolver, WarBoard, ZoneStore};

/// Logical war notifications for dependent features (countdowns, relays).
#[derive(Debug, Clone)]
pub enum WarEvent {
    Started {
        attacker: String,
        defender: String,
        started_at: DateTime<Utc>,
    },
    Ended {
        group: String,
        opponent: Option<String>,
        outcome: WarOutcome,
        zone_id: ZoneId,
        attackable_at: DateTime<Utc>,
    },
}

pub struct WarTracker {
    zones: ZoneStore,
    tags: GroupTagResolver,
    wars: WarBoard,
    clock: Arc<dyn ClockPort>,
    backfill: mpsc::Sender<String>,
    events: broadcast::Sender<WarEvent>,
}

impl WarTracker {
    pub fn new(
        zones: ZoneStore,
        tags: GroupTagResolver,
        wars: WarBoard,
        clock: Arc<dyn ClockPort>,
        backfill: mpsc::Sender<String>,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            zones,
            tags,
            wars,
            clock,
            backfill,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WarEvent> {
        self.events.subscribe()
    }

    /// Apply one chat line. Lines that are not war announcements are
    /// ignored.
    pub fn handle_line(&self, raw: &str) {
        match parse_war_line(raw) {
            Some(WarLine::Started { attacker, defender }) => self.on_started(attacker, defender),
            Some(WarLine::Outcome {
                group,
                outcome,
                zone_id,
            }) => self.on_outcome(group, outcome, zone_id),
            None => {}
        }
    }

    fn on_started(&self, attacker: String, defender: String) {
        let now = self.clock.now();
        if let Err(error) = self.wars.begin_war(&attacker, &defender, now) {
            tracing::error!(%error, "failed to persist war start");
        }
        tracing::info!(attacker = %attacker, defender = %defender, "zone war started");

        for side in [&attacker, &defender] {
            if self.tags.tag_of(side).is_none() && self.backfill.try_send(side.clone()).is_err() {
                tracing::warn!(group = %side, "tag backfill queue full, dropping request");
            }
        }

        let _ = self.events.send(WarEvent::Started {
            attacker,
            defender,
            started_at: now,
        });
    }

    fn on_outcome(&self, group: String, outcome: WarOutcome, zone_id: ZoneId) {
        let now = self.clock.now();
        let opponent = match self.wars.end_war(&group) {
            Ok(status) => status.map(|s| s.opponent),
            Err(error) => {
                tracing::error!(%error, "failed to clear war status");
                None
            }
        };

        // The announcing group holds the zone either way: the attacker on
        // a takeover, the standing owner on a defense. Both reset the
        // cycle.
        match self.zones.record_capture(zone_id, &group, now) {
            Ok(capture) => {
                tracing::info!(
                    zone = %zone_id,
                    group = %group,
                    outcome = %outcome,
                    previous_owner = capture.previous_owner.as_deref().unwrap_or("none"),
                    "zone war ended"
                );
                let _ = self.events.send(WarEvent::Ended {
                    group,
                    opponent,
                    outcome,
                    zone_id,
                    attackable_at: capture.attackable_at,
                });
            }
            Err(error) => tracing::error!(zone = %zone_id, %error, "failed to persist capture"),
        }
    }

    /// Consume the identity's chat stream until shutdown.
    pub async fn run(self: Arc<Self>, correlator: Arc<Correlator>, shutdown: CancellationToken) {
        let mut events = correlator.subscribe();
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = events.recv() => match event {
                    Ok(event) => {
                        if let Some(chat) = event.as_chat_line() {
                            self.handle_line(&chat.raw);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "war tracker lagged behind the chat stream");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::ManualClock;
    use crate::stores;
    use chrono::{Duration, TimeZone};
    use zonewarden_domain::CycleConfig;

    struct Fixture {
        tracker: WarTracker,
        zones: ZoneStore,
        wars: WarBoard,
        clock: Arc<ManualClock>,
        backfill_rx: mpsc::Receiver<String>,
        _dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().expect("tempdir");
        let (zones, tags, wars) = stores::open(
            dir.path().join("zones.json"),
            dir.path().join("zone_positions.json"),
            CycleConfig::default(),
        )
        .expect("open stores");
        let clock = Arc::new(ManualClock::at(
            Utc.with_ymd_and_hms(2025, 7, 4, 20, 0, 0).single().expect("ts"),
        ));
        let (backfill_tx, backfill_rx) = mpsc::channel(8);
        let tracker = WarTracker::new(
            zones.clone(),
            tags,
            wars.clone(),
            clock.clone(),
            backfill_tx,
        );
        Fixture {
            tracker,
            zones,
            wars,
            clock,
            backfill_rx,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn test_war_lifecycle_applies_capture_and_clears_both_sides() {
        let fx = fixture();
        let started_at = fx.clock.now();

        fx.tracker.handle_line("ZONE WAR: Alpha vs Beta");
        assert_eq!(fx.wars.status_of("Alpha").expect("war").opponent, "Beta");
        assert_eq!(fx.wars.status_of("Beta").expect("war").opponent, "Alpha");
        assert_eq!(fx.wars.status_of("Alpha").expect("war").started_at, started_at);

        fx.clock.advance(Duration::minutes(10));
        fx.tracker.handle_line("ZONE WAR: Alpha takes over zone '# 7'");

        assert!(fx.wars.status_of("Alpha").is_none());
        assert!(fx.wars.status_of("Beta").is_none());
        assert_eq!(fx.zones.owner_of(ZoneId::new(7)).as_deref(), Some("Alpha"));
        assert_eq!(
            fx.zones.captured_at(ZoneId::new(7)),
            Some(started_at + Duration::minutes(10))
        );
    }

    #[tokio::test]
    async fn test_defense_resets_cycle_without_owner_change() {
        let fx = fixture();
        fx.tracker.handle_line("ZONE WAR: Gamma vs Delta");
        // Delta already held zone 12.
        fx.zones
            .record_capture(ZoneId::new(12), "Delta", fx.clock.now() - Duration::days(1))
            .expect("seed capture");

        fx.clock.advance(Duration::minutes(15));
        fx.tracker.handle_line("ZONE WAR: Delta keeps zone '#12'");

        assert_eq!(fx.zones.owner_of(ZoneId::new(12)).as_deref(), Some("Delta"));
        assert_eq!(fx.zones.captured_at(ZoneId::new(12)), Some(fx.clock.now()));
        assert!(!fx.zones.is_attackable(ZoneId::new(12), fx.clock.now()));
    }

    #[tokio::test]
    async fn test_war_start_requests_tag_backfill_for_unknown_groups() {
        let mut fx = fixture();
        fx.tracker.handle_line("ZONE WAR: Alpha vs Beta");

        let first = fx.backfill_rx.try_recv().expect("first request");
        let second = fx.backfill_rx.try_recv().expect("second request");
        assert_eq!(first, "Alpha");
        assert_eq!(second, "Beta");
    }

    #[tokio::test]
    async fn test_events_are_emitted_for_both_phases() {
        let fx = fixture();
        let mut events = fx.tracker.subscribe();

        fx.tracker.handle_line("ZONE WAR: Alpha vs Beta");
        fx.clock.advance(Duration::minutes(5));
        fx.tracker.handle_line("ZONE WAR: Beta keeps zone '#4'");

        match events.try_recv().expect("started event") {
            WarEvent::Started { attacker, defender, .. } => {
                assert_eq!(attacker, "Alpha");
                assert_eq!(defender, "Beta");
            }
            other => panic!("expected Started, got {other:?}"),
        }
        match events.try_recv().expect("ended event") {
            WarEvent::Ended {
                group,
                opponent,
                outcome,
                zone_id,
                ..
            } => {
                assert_eq!(group, "Beta");
                assert_eq!(opponent.as_deref(), Some("Alpha"));
                assert_eq!(outcome, WarOutcome::Keeps);
                assert_eq!(zone_id, ZoneId::new(4));
            }
            other => panic!("expected Ended, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_war_lines_are_ignored() {
        let mut fx = fixture();
        fx.tracker.handle_line("Kowalski: anyone selling a car?");
        assert!(fx.wars.status_of("Kowalski").is_none());
        assert!(fx.backfill_rx.try_recv().is_err());
    }
}
