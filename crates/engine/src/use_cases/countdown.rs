//! War countdown schedules.
//!
//! Each war start spawns one task driving an ordered `(offset, message)`
//! list; a war end cancels the whole schedule as a unit. This replaces
//! per-threshold nested timers with a single cancellable sequence.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::use_cases::war_tracker::WarEvent;

#[derive(Debug, Clone)]
pub struct CountdownStep {
    pub offset: Duration,
    pub message: String,
}

/// Build the standard schedule from minute marks.
pub fn schedule_from_minutes(minutes: &[u64]) -> Vec<CountdownStep> {
    let mut steps: Vec<CountdownStep> = minutes
        .iter()
        .map(|m| CountdownStep {
            offset: Duration::from_secs(m * 60),
            message: format!("{m} minutes into the war"),
        })
        .collect();
    steps.sort_by_key(|s| s.offset);
    steps
}

/// Active per-war countdown tasks.
pub struct WarCountdowns {
    steps: Vec<CountdownStep>,
    announcements: mpsc::Sender<String>,
    active: Mutex<HashMap<String, CancellationToken>>,
}

impl WarCountdowns {
    pub fn new(mut steps: Vec<CountdownStep>, announcements: mpsc::Sender<String>) -> Self {
        steps.sort_by_key(|s| s.offset);
        Self {
            steps,
            announcements,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Pair key, order-insensitive so either side's outcome line cancels.
    fn key(a: &str, b: &str) -> String {
        let mut sides = [a.to_lowercase(), b.to_lowercase()];
        sides.sort();
        sides.join("|")
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn start(&self, attacker: &str, defender: &str) {
        let key = Self::key(attacker, defender);
        let token = CancellationToken::new();
        {
            let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(stale) = active.insert(key.clone(), token.clone()) {
                stale.cancel();
            }
        }

        let steps = self.steps.clone();
        let announcements = self.announcements.clone();
        let war = format!("{attacker} vs {defender}");
        tokio::spawn(async move {
            let started = tokio::time::Instant::now();
            for step in steps {
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = tokio::time::sleep_until(started + step.offset) => {
                        let _ = announcements.send(format!("{war}: {}", step.message)).await;
                    }
                }
            }
        });
    }

    fn stop(&self, group: &str, opponent: Option<&str>) {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        match opponent {
            Some(opponent) => {
                if let Some(token) = active.remove(&Self::key(group, opponent)) {
                    token.cancel();
                }
            }
            None => {
                // Opponent unknown (missed start line): cancel any schedule
                // mentioning the group.
                let needle = group.to_lowercase();
                active.retain(|key, token| {
                    if key.split('|').any(|side| side == needle) {
                        token.cancel();
                        false
                    } else {
                        true
                    }
                });
            }
        }
    }

    /// Consume war events until shutdown.
    pub async fn run(
        self: Arc<Self>,
        mut events: broadcast::Receiver<WarEvent>,
        shutdown: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = events.recv() => match event {
                    Ok(WarEvent::Started { attacker, defender, .. }) => {
                        self.start(&attacker, &defender);
                    }
                    Ok(WarEvent::Ended { group, opponent, .. }) => {
                        self.stop(&group, opponent.as_deref());
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "countdown lagged behind war events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    }
}
