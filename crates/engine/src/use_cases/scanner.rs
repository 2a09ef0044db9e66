//! Reconciliation scanner.
//!
//! The chat-log parse is the only push source of capture events and it
//! can miss lines, so stored state drifts. This scanner actively probes
//! every known zone with a dedicated identity: teleport to the zone,
//! query it, parse the response, and correct the store where the server
//! disagrees. Probes run strictly one at a time; the probe identity has a
//! single dialog channel and concurrent flows would cross-talk.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use zonewarden_domain::ZoneId;

use crate::infrastructure::correlator::{CorrelationTimeout, Correlator};
use crate::infrastructure::ports::{ActionError, ActionPort, ClockPort, StoreError};
use crate::parse::markup::{clean_text, page_from_dialog};
use crate::parse::zone_info::{parse_zone_info, ZoneInfoReport};
use crate::stores::ZoneStore;
use crate::use_cases::tag_lookup::TagLookup;

#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub info_command: String,
    pub info_title: String,
    /// Deadline for the info dialog after the query is sent.
    pub probe_timeout: Duration,
    /// Time allowed for the teleport to land before querying.
    pub settle_delay: Duration,
    /// Timeout retry ceiling per zone.
    pub max_retries: u32,
    /// Transport retry ceiling for the critical teleport/query sends.
    pub send_retries: u32,
    pub send_backoff: Duration,
    /// Pause between full passes.
    pub pass_pause: Duration,
    /// Pause when there is nothing to scan.
    pub idle_pause: Duration,
    /// Stored capture times further than this from the server-implied
    /// value are overwritten.
    pub drift_tolerance: chrono::Duration,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            info_command: "/gzinfo".into(),
            info_title: "group zone info".into(),
            probe_timeout: Duration::from_secs(10),
            settle_delay: Duration::from_secs(5),
            max_retries: 3,
            send_retries: 3,
            send_backoff: Duration::from_millis(500),
            pass_pause: Duration::from_secs(30),
            idle_pause: Duration::from_secs(60),
            drift_tolerance: chrono::Duration::minutes(3),
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum ProbeError {
    #[error("info dialog did not arrive")]
    Timeout(#[source] CorrelationTimeout),
    /// The response parsed to a different zone: a stale or crossed reply,
    /// not a transient failure. Never retried.
    #[error("response reports zone {reported}, expected {expected}")]
    Mismatch { expected: ZoneId, reported: ZoneId },
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone, Copy)]
enum Outbound<'a> {
    Command(&'a str),
    ClientAction(&'a str),
}

pub struct ReconciliationScanner {
    actions: Arc<dyn ActionPort>,
    correlator: Arc<Correlator>,
    zones: ZoneStore,
    tag_lookup: Arc<TagLookup>,
    clock: Arc<dyn ClockPort>,
    config: ScannerConfig,
    running: AtomicBool,
    busy: AtomicBool,
}

impl ReconciliationScanner {
    pub fn new(
        actions: Arc<dyn ActionPort>,
        correlator: Arc<Correlator>,
        zones: ZoneStore,
        tag_lookup: Arc<TagLookup>,
        clock: Arc<dyn ClockPort>,
        config: ScannerConfig,
    ) -> Self {
        Self {
            actions,
            correlator,
            zones,
            tag_lookup,
            clock,
            config,
            running: AtomicBool::new(false),
            busy: AtomicBool::new(false),
        }
    }

    /// Scan passes until shutdown. Re-entering a running scan loop is a
    /// no-op.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::warn!("scan loop already running, ignoring second start");
            return;
        }
        tracing::info!("reconciliation scanning started");

        loop {
            if shutdown.is_cancelled() {
                break;
            }
            let queue = self.build_queue();
            if queue.is_empty() {
                tracing::debug!("no scannable zones, waiting");
                if pause(&shutdown, self.config.idle_pause).await {
                    break;
                }
                continue;
            }

            tracing::info!(zones = queue.len(), "scan pass started");
            for (index, zone_id) in queue.iter().enumerate() {
                if shutdown.is_cancelled() {
                    break;
                }
                tracing::debug!(
                    zone = %zone_id,
                    position = index + 1,
                    total = queue.len(),
                    "probing zone"
                );
                self.scan_zone(*zone_id).await;
            }
            if pause(&shutdown, self.config.pass_pause).await {
                break;
            }
        }

        self.running.store(false, Ordering::SeqCst);
        tracing::info!("reconciliation scanning stopped");
    }

    /// Zones with a known position and a recorded capture, oldest capture
    /// first.
    fn build_queue(&self) -> Vec<ZoneId> {
        let mut entries: Vec<(ZoneId, DateTime<Utc>)> = self
            .zones
            .entries()
            .into_iter()
            .filter_map(|entry| match (entry.zone.position, entry.zone.captured_at) {
                (Some(_), Some(captured_at)) => Some((entry.id, captured_at)),
                _ => None,
            })
            .collect();
        entries.sort_by_key(|(_, captured_at)| *captured_at);
        entries.into_iter().map(|(id, _)| id).collect()
    }

    /// Probe one zone, retrying timeouts up to the ceiling. Suppressed
    /// entirely while another probe (or its nested tag lookup) holds the
    /// dialog channel.
    pub async fn scan_zone(&self, zone_id: ZoneId) {
        if self.busy.swap(true, Ordering::SeqCst) {
            tracing::warn!(zone = %zone_id, "probe already in flight, skipping");
            return;
        }
        self.scan_zone_locked(zone_id).await;
        self.busy.store(false, Ordering::SeqCst);
    }

    async fn scan_zone_locked(&self, zone_id: ZoneId) {
        for attempt in 1..=self.config.max_retries {
            match self.probe_zone(zone_id).await {
                Ok(()) => return,
                Err(ProbeError::Timeout(_)) => {
                    tracing::warn!(zone = %zone_id, attempt, "probe timed out");
                }
                Err(ProbeError::Mismatch { expected, reported }) => {
                    tracing::warn!(
                        zone = %expected,
                        reported = %reported,
                        "crossed response, skipping zone"
                    );
                    return;
                }
                Err(error) => {
                    tracing::warn!(zone = %zone_id, %error, "probe failed, skipping zone");
                    return;
                }
            }
        }
        tracing::warn!(
            zone = %zone_id,
            attempts = self.config.max_retries,
            "giving up on zone this pass"
        );
    }

    async fn probe_zone(&self, zone_id: ZoneId) -> Result<(), ProbeError> {
        let Some(position) = self.zones.position_of(zone_id) else {
            tracing::debug!(zone = %zone_id, "position unmapped, skipping");
            return Ok(());
        };

        self.send_with_backoff(Outbound::ClientAction(&format!(
            "teleport|{}|{}|{}",
            position.x, position.y, position.z
        )))
        .await?;
        tokio::time::sleep(self.config.settle_delay).await;
        self.send_with_backoff(Outbound::Command(&self.config.info_command))
            .await?;

        let title_needle = self.config.info_title.to_lowercase();
        let event = self
            .correlator
            .wait_dialog(self.config.probe_timeout, move |d| {
                clean_text(&d.title).to_lowercase().contains(&title_needle)
            })
            .await
            .map_err(ProbeError::Timeout)?;

        let report = parse_zone_info(&page_from_dialog(&event));
        if let Some(reported) = report.zone_id {
            if reported != zone_id {
                return Err(ProbeError::Mismatch {
                    expected: zone_id,
                    reported,
                });
            }
        }
        self.reconcile(zone_id, report).await
    }

    async fn reconcile(&self, zone_id: ZoneId, report: ZoneInfoReport) -> Result<(), ProbeError> {
        if let Some(owner) = report.owner.as_deref() {
            if self.tag_lookup.tags().tag_of(owner).is_none() {
                // The nested flow shares this probe's dialog channel, so
                // the scan blocks on it instead of risking cross-talk.
                if let Err(error) = self.tag_lookup.fetch_tag(owner).await {
                    tracing::warn!(group = %owner, %error, "tag lookup during scan failed");
                }
            }
        }

        let now = self.clock.now();
        let stored_owner = self.zones.owner_of(zone_id);
        let owner_correction = report
            .owner
            .as_deref()
            .filter(|reported| stored_owner.as_deref() != Some(*reported));

        let cycle = self.zones.cycle();
        let captured_correction = report.attackable_in.and_then(|remaining| {
            let implied = cycle.captured_at_implied_by(remaining, now);
            match self.zones.captured_at(zone_id) {
                None => Some(implied),
                Some(stored) => {
                    let drift = (implied - stored).num_seconds().abs();
                    (drift > self.config.drift_tolerance.num_seconds()).then_some(implied)
                }
            }
        });

        if owner_correction.is_none() && captured_correction.is_none() {
            return Ok(());
        }
        if let Some(owner) = owner_correction {
            tracing::info!(
                zone = %zone_id,
                from = stored_owner.as_deref().unwrap_or("none"),
                to = %owner,
                "owner corrected from probe"
            );
        }
        if let Some(captured_at) = captured_correction {
            tracing::info!(zone = %zone_id, %captured_at, "capture time corrected from probe");
        }
        self.zones
            .apply_correction(zone_id, owner_correction, captured_correction)?;
        Ok(())
    }

    async fn send_with_backoff(&self, outbound: Outbound<'_>) -> Result<(), ProbeError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = match outbound {
                Outbound::Command(command) => self.actions.send_command(command).await,
                Outbound::ClientAction(action) => self.actions.send_client_action(action).await,
            };
            match result {
                Ok(()) => return Ok(()),
                Err(error) if attempt < self.config.send_retries => {
                    tracing::warn!(attempt, %error, "critical send failed, backing off");
                    tokio::time::sleep(self.config.send_backoff).await;
                }
                Err(error) => return Err(ProbeError::Action(error)),
            }
        }
    }
}

async fn pause(shutdown: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => true,
        _ = tokio::time::sleep(duration) => false,
    }
}
