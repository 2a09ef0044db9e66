//! Group tag extraction.
//!
//! Tags are only visible inside the game's group-stats dialog, so
//! resolving one is a multi-step flow: list groups, walk pages to the
//! entry, select it, and scrape the stats dialog. The flow occupies the
//! identity's single dialog channel from start to finish, so requests are
//! funneled through a single-flight worker and never run concurrently.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::infrastructure::correlator::{CorrelationTimeout, Correlator};
use crate::infrastructure::ports::{ActionError, ActionPort, DialogResponse, StoreError};
use crate::parse::markup::{clean_text, page_from_dialog};
use crate::parse::rows::IndexedNameGrammar;
use crate::parse::zone_info::parse_group_tag;
use crate::stores::GroupTagResolver;
use crate::use_cases::walker::{find_in_pages, WalkError, WalkerConfig};

#[derive(Debug, Clone)]
pub struct TagLookupConfig {
    pub list_command: String,
    pub list_title: String,
    pub stats_title: String,
    pub dialog_timeout: Duration,
    pub walker: WalkerConfig,
}

impl Default for TagLookupConfig {
    fn default() -> Self {
        Self {
            list_command: "/groups".into(),
            list_title: "online groups".into(),
            stats_title: "group stats".into(),
            dialog_timeout: Duration::from_secs(5),
            walker: WalkerConfig::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TagLookupError {
    #[error("group list dialog did not arrive")]
    ListTimeout(#[source] CorrelationTimeout),
    #[error("stats dialog did not arrive")]
    StatsTimeout(#[source] CorrelationTimeout),
    #[error("group not present in the list")]
    GroupNotListed,
    #[error("stats dialog carries no tag line")]
    TagMissing,
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One identity's tag-extraction flow.
pub struct TagLookup {
    actions: Arc<dyn ActionPort>,
    correlator: Arc<Correlator>,
    tags: GroupTagResolver,
    config: TagLookupConfig,
}

impl TagLookup {
    pub fn new(
        actions: Arc<dyn ActionPort>,
        correlator: Arc<Correlator>,
        tags: GroupTagResolver,
        config: TagLookupConfig,
    ) -> Self {
        Self {
            actions,
            correlator,
            tags,
            config,
        }
    }

    pub fn tags(&self) -> &GroupTagResolver {
        &self.tags
    }

    /// Run the full sub-flow and persist the extracted tag. Returns the
    /// tag as assigned (possibly suffix-renamed on collision).
    pub async fn fetch_tag(&self, group_name: &str) -> Result<String, TagLookupError> {
        self.actions.send_command(&self.config.list_command).await?;

        let list_needle = self.config.list_title.to_lowercase();
        let list_event = self
            .correlator
            .wait_dialog(self.config.dialog_timeout, move |d| {
                clean_text(&d.title).to_lowercase().contains(&list_needle)
            })
            .await
            .map_err(TagLookupError::ListTimeout)?;

        let hit = find_in_pages(
            self.actions.as_ref(),
            &self.correlator,
            &self.config.walker,
            page_from_dialog(&list_event),
            &self.config.list_title,
            &IndexedNameGrammar,
            group_name,
        )
        .await
        .map_err(|e| match e {
            WalkError::NotFound { .. } => TagLookupError::GroupNotListed,
            WalkError::Action(a) => TagLookupError::Action(a),
        })?;

        self.actions
            .send_dialog_response(DialogResponse::select(hit.dialog_id, hit.row_index))
            .await?;

        let stats_needle = self.config.stats_title.to_lowercase();
        let stats_event = self
            .correlator
            .wait_dialog(self.config.dialog_timeout, move |d| {
                clean_text(&d.title).to_lowercase().contains(&stats_needle)
            })
            .await
            .map_err(TagLookupError::StatsTimeout)?;

        let stats_page = page_from_dialog(&stats_event);
        let tag = parse_group_tag(&stats_page).ok_or(TagLookupError::TagMissing)?;
        let assigned = self.tags.set_tag(group_name, &tag)?;
        tracing::info!(group = %group_name, tag = %assigned, "group tag extracted");
        Ok(assigned)
    }
}

/// Spawn the single-flight backfill worker. Senders enqueue group names;
/// the worker skips groups whose tag is already known and processes one
/// request at a time.
pub fn spawn_backfill_worker(
    lookup: Arc<TagLookup>,
    shutdown: CancellationToken,
) -> (mpsc::Sender<String>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<String>(32);
    let handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                request = rx.recv() => {
                    let Some(group) = request else { break };
                    if lookup.tags().tag_of(&group).is_some() {
                        continue;
                    }
                    if let Err(error) = lookup.fetch_tag(&group).await {
                        tracing::warn!(group = %group, %error, "tag backfill failed");
                    }
                }
            }
        }
    });
    (tx, handle)
}
