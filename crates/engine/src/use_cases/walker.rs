//! Pagination walker.
//!
//! Drives a multi-page list dialog forward page by page looking for a
//! target entry. Reused for rosters, group lists, and rank lists; the
//! only axis of variation is the row grammar and the match target.

use std::time::Duration;

use zonewarden_domain::{DialogId, DialogPage};

use crate::infrastructure::correlator::Correlator;
use crate::infrastructure::ports::{ActionError, ActionPort, DialogResponse};
use crate::parse::markup::{clean_text, page_from_dialog};
use crate::parse::rows::RowGrammar;

#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Hard cap on pages visited before giving up.
    pub max_pages: usize,
    /// How long to wait for a page after sending the advance action.
    pub page_timeout: Duration,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            max_pages: 10,
            page_timeout: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WalkError {
    /// All pages exhausted, the page cap hit, or an expected page never
    /// arrived.
    #[error("entry not found after {pages_scanned} page(s)")]
    NotFound { pages_scanned: usize },
    #[error(transparent)]
    Action(#[from] ActionError),
}

/// A located entry.
#[derive(Debug, Clone)]
pub struct PageHit<R> {
    pub page_index: usize,
    /// Line index within the page, which doubles as the dialog list index
    /// for a subsequent select action.
    pub row_index: usize,
    /// Dialog id of the page the entry was found on.
    pub dialog_id: DialogId,
    pub raw_entry: String,
    pub row: R,
}

/// Walk pages starting from `first_page` until a row whose name contains
/// `target` (case-insensitive) is found.
///
/// The first match wins; there is no ranking of multiple matches. Pages
/// after the first are awaited with `page_timeout`; a page that never
/// arrives surfaces as `NotFound`, not as a timeout, because a missing
/// page and an exhausted list are indistinguishable to the caller.
pub async fn find_in_pages<G>(
    actions: &dyn ActionPort,
    correlator: &Correlator,
    config: &WalkerConfig,
    first_page: DialogPage,
    page_title: &str,
    grammar: &G,
    target: &str,
) -> Result<PageHit<G::Row>, WalkError>
where
    G: RowGrammar,
{
    let needle = target.to_lowercase();
    let mut page = first_page;

    for page_index in 0..config.max_pages {
        for (row_index, line) in page.lines.iter().enumerate() {
            if let Some(row) = grammar.parse(line) {
                if grammar.name(&row).to_lowercase().contains(&needle) {
                    return Ok(PageHit {
                        page_index,
                        row_index,
                        dialog_id: page.dialog_id,
                        raw_entry: line.clone(),
                        row,
                    });
                }
            }
        }

        if !page.has_next || page_index + 1 == config.max_pages {
            return Err(WalkError::NotFound {
                pages_scanned: page_index + 1,
            });
        }

        actions
            .send_dialog_response(DialogResponse::next_page(page.dialog_id))
            .await?;
        let title_needle = page_title.to_lowercase();
        match correlator
            .wait_dialog(config.page_timeout, move |d| {
                clean_text(&d.title).to_lowercase().contains(&title_needle)
            })
            .await
        {
            Ok(event) => page = page_from_dialog(&event),
            Err(_) => {
                tracing::debug!(page = page_index + 1, "next page never arrived");
                return Err(WalkError::NotFound {
                    pages_scanned: page_index + 1,
                });
            }
        }
    }

    Err(WalkError::NotFound {
        pages_scanned: config.max_pages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::MockActionPort;
    use crate::parse::rows::RosterGrammar;
    use crate::test_fixtures::{roster_dialog, ScriptedBridge};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_target_on_third_page_takes_two_advances() {
        let correlator = Arc::new(Correlator::new());
        let bridge = Arc::new(ScriptedBridge::new(correlator.clone()));

        let page1 = roster_dialog(100, "Alpha Roster (1/3)", &["1  Smith  900  Member  1 May"], true);
        bridge.queue_response_reply(roster_dialog(
            101,
            "Alpha Roster (2/3)",
            &["1  Jones  850  Member  3 May"],
            true,
        ));
        bridge.queue_response_reply(roster_dialog(
            102,
            "Alpha Roster (3/3)",
            &["1  Kowalski  800  Leader  4 May"],
            false,
        ));

        let hit = find_in_pages(
            bridge.as_ref(),
            &correlator,
            &WalkerConfig::default(),
            page_from_dialog(&page1.as_dialog().expect("dialog").clone()),
            "alpha roster",
            &RosterGrammar,
            "kowalski",
        )
        .await
        .expect("hit");

        assert_eq!(hit.page_index, 2);
        assert_eq!(hit.row_index, 0);
        assert_eq!(hit.dialog_id, DialogId::new(102));
        assert_eq!(hit.row.name, "Kowalski");
        // Exactly two advance actions were issued.
        let responses = bridge.dialog_responses();
        assert_eq!(responses.len(), 2);
        assert!(responses.iter().all(|r| r.input_text == "Next"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_absent_target_surfaces_not_found() {
        let correlator = Arc::new(Correlator::new());
        let bridge = Arc::new(ScriptedBridge::new(correlator.clone()));

        let page1 = roster_dialog(200, "Alpha Roster", &["1  Smith  900  Member  1 May"], true);
        bridge.queue_response_reply(roster_dialog(
            201,
            "Alpha Roster",
            &["1  Jones  850  Member  3 May"],
            false,
        ));

        let result = find_in_pages(
            bridge.as_ref(),
            &correlator,
            &WalkerConfig::default(),
            page_from_dialog(&page1.as_dialog().expect("dialog").clone()),
            "alpha roster",
            &RosterGrammar,
            "nobody",
        )
        .await;

        assert!(matches!(
            result,
            Err(WalkError::NotFound { pages_scanned: 2 })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missed_page_surfaces_not_found() {
        let correlator = Arc::new(Correlator::new());
        let bridge = Arc::new(ScriptedBridge::new(correlator.clone()));
        // No reply queued: the advance action goes unanswered.
        let page1 = roster_dialog(300, "Alpha Roster", &["1  Smith  900  Member  1 May"], true);

        let result = find_in_pages(
            bridge.as_ref(),
            &correlator,
            &WalkerConfig::default(),
            page_from_dialog(&page1.as_dialog().expect("dialog").clone()),
            "alpha roster",
            &RosterGrammar,
            "kowalski",
        )
        .await;

        assert!(matches!(result, Err(WalkError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_single_page_without_next_needs_no_actions() {
        let correlator = Correlator::new();
        // Strict mock: any action send would panic the test.
        let actions = MockActionPort::new();

        let page = roster_dialog(400, "Alpha Roster", &["1  Kowalski  800  Leader  4 May"], false);
        let hit = find_in_pages(
            &actions,
            &correlator,
            &WalkerConfig::default(),
            page_from_dialog(&page.as_dialog().expect("dialog").clone()),
            "alpha roster",
            &RosterGrammar,
            "kowal",
        )
        .await
        .expect("hit");

        assert_eq!(hit.page_index, 0);
        assert_eq!(hit.row.role, "Leader");
    }
}
