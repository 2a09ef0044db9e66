//! Roster lookups and group event handling.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::infrastructure::correlator::{CorrelationTimeout, Correlator};
use crate::infrastructure::ports::{ActionError, ActionPort};
use crate::parse::chat::{parse_group_event, GroupEventLine};
use crate::parse::markup::{clean_text, page_from_dialog};
use crate::parse::rows::RosterGrammar;
use crate::use_cases::walker::{find_in_pages, WalkError, WalkerConfig};

#[derive(Debug, Clone)]
pub struct RosterConfig {
    pub command: String,
    pub dialog_timeout: Duration,
    pub walker: WalkerConfig,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            command: "/gmembers".into(),
            dialog_timeout: Duration::from_secs(5),
            walker: WalkerConfig::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("roster dialog did not arrive")]
    DialogTimeout(#[source] CorrelationTimeout),
    #[error("player not found in the roster")]
    PlayerNotFound,
    #[error(transparent)]
    Action(#[from] ActionError),
}

/// A roster entry as located by the walker.
#[derive(Debug, Clone)]
pub struct MemberRecord {
    pub name: String,
    pub role: String,
    pub last_active: String,
    pub page_index: usize,
    pub row_index: usize,
}

/// Finds members inside a group's paginated roster dialog.
pub struct RosterLookup {
    actions: Arc<dyn ActionPort>,
    correlator: Arc<Correlator>,
    config: RosterConfig,
}

impl RosterLookup {
    pub fn new(
        actions: Arc<dyn ActionPort>,
        correlator: Arc<Correlator>,
        config: RosterConfig,
    ) -> Self {
        Self {
            actions,
            correlator,
            config,
        }
    }

    pub async fn find_member(&self, player: &str, group: &str) -> Result<MemberRecord, RosterError> {
        self.actions.send_command(&self.config.command).await?;

        let title_needle = group.to_lowercase();
        let first = self
            .correlator
            .wait_dialog(self.config.dialog_timeout, move |d| {
                clean_text(&d.title).to_lowercase().contains(&title_needle)
            })
            .await
            .map_err(RosterError::DialogTimeout)?;

        let hit = find_in_pages(
            self.actions.as_ref(),
            &self.correlator,
            &self.config.walker,
            page_from_dialog(&first),
            group,
            &RosterGrammar,
            player,
        )
        .await
        .map_err(|e| match e {
            WalkError::NotFound { .. } => RosterError::PlayerNotFound,
            WalkError::Action(a) => RosterError::Action(a),
        })?;

        Ok(MemberRecord {
            name: hit.row.name,
            role: hit.row.role,
            last_active: hit.row.last_active,
            page_index: hit.page_index,
            row_index: hit.row_index,
        })
    }
}

/// Reacts to `GROUP:` roster event lines on the chat stream. Lookups run
/// inline so the dialog channel never sees two roster flows at once.
pub struct GroupEventWatcher {
    roster: Arc<RosterLookup>,
    home_group: String,
}

impl GroupEventWatcher {
    pub fn new(roster: Arc<RosterLookup>, home_group: String) -> Self {
        Self { roster, home_group }
    }

    pub async fn run(self, correlator: Arc<Correlator>, shutdown: CancellationToken) {
        let mut events = correlator.subscribe();
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = events.recv() => match event {
                    Ok(event) => {
                        if let Some(chat) = event.as_chat_line() {
                            self.handle_line(&chat.raw).await;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "group event watcher lagged behind chat");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    }

    async fn handle_line(&self, raw: &str) {
        match parse_group_event(raw) {
            Some(GroupEventLine::Login { player, rank }) => {
                tracing::info!(player = %player.name, rank = %rank, "member logged in");
                match self.roster.find_member(&player.name, &self.home_group).await {
                    Ok(member) => tracing::info!(
                        player = %member.name,
                        role = %member.role,
                        last_active = %member.last_active,
                        "member details refreshed"
                    ),
                    Err(error) => {
                        tracing::warn!(player = %player.name, %error, "member lookup failed");
                    }
                }
            }
            Some(GroupEventLine::Logout { player }) => {
                tracing::info!(player = %player.name, "member logged out");
            }
            Some(GroupEventLine::RankChange { player, from, to }) => {
                tracing::info!(player = %player.name, %from, %to, "member rank changed");
            }
            Some(GroupEventLine::RoleChange { player, from, to }) => {
                tracing::info!(player = %player.name, %from, %to, "member role changed");
            }
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{roster_dialog, ScriptedBridge};

    #[tokio::test(start_paused = true)]
    async fn test_find_member_returns_row_details() {
        let correlator = Arc::new(Correlator::new());
        let bridge = Arc::new(ScriptedBridge::new(correlator.clone()));

        bridge.queue_command_reply(
            "/gmembers",
            roster_dialog(
                70,
                "Members of Alpha",
                &[
                    "1  Smith  900  Member  1 May",
                    "2  Kowalski  800  Co-Leader  4 May",
                ],
                false,
            ),
        );

        let roster = RosterLookup::new(bridge.clone(), correlator, RosterConfig::default());
        let member = roster.find_member("kowalski", "Alpha").await.expect("member");

        assert_eq!(member.name, "Kowalski");
        assert_eq!(member.role, "Co-Leader");
        assert_eq!(member.last_active, "4 May");
        assert_eq!(member.page_index, 0);
        assert_eq!(member.row_index, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_roster_dialog_times_out() {
        let correlator = Arc::new(Correlator::new());
        let bridge = Arc::new(ScriptedBridge::new(correlator.clone()));

        let roster = RosterLookup::new(bridge, correlator, RosterConfig::default());
        let result = roster.find_member("kowalski", "Alpha").await;
        assert!(matches!(result, Err(RosterError::DialogTimeout(_))));
    }
}
