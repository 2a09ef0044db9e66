//! Game markup stripping.
//!
//! Dialog and chat payloads embed inline color codes (`{FF0000}`) and
//! short formatting tags (`<b>`, `</i>`). Everything downstream of the
//! ingress works on cleaned text.

use std::sync::LazyLock;

use regex_lite::Regex;
use zonewarden_domain::{DialogEvent, DialogPage};

static COLOR_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\{[0-9a-f]{6}\}").expect("valid regex"));
static FORMAT_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?[a-z]{1,2}>").expect("valid regex"));

/// Remove inline `{RRGGBB}` color codes.
pub fn strip_colors(input: &str) -> String {
    COLOR_CODE.replace_all(input, "").into_owned()
}

/// Remove color codes and short formatting tags, and trim.
pub fn clean_text(input: &str) -> String {
    let stripped = strip_colors(input);
    FORMAT_TAG.replace_all(&stripped, "").trim().to_string()
}

/// Build a cleaned [`DialogPage`] from a raw dialog notification.
///
/// `has_next` mirrors the game's pagination convention: the first button
/// of a paginated list reads "Next" on every page but the last.
pub fn page_from_dialog(event: &DialogEvent) -> DialogPage {
    let lines = event
        .info
        .split('\n')
        .map(clean_text)
        .filter(|line| !line.is_empty())
        .collect();
    let has_next = event
        .buttons
        .first()
        .map(|b| b.eq_ignore_ascii_case("next"))
        .unwrap_or(false);
    DialogPage {
        dialog_id: event.dialog_id,
        title: clean_text(&event.title),
        lines,
        has_next,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zonewarden_domain::DialogId;

    #[test]
    fn test_strip_colors() {
        assert_eq!(strip_colors("{FF0000}Zone {00ff00}Info"), "Zone Info");
        assert_eq!(strip_colors("no markup"), "no markup");
    }

    #[test]
    fn test_clean_text_removes_tags_and_trims() {
        assert_eq!(clean_text("  <b>{FFFFFF}Group Stats</b> "), "Group Stats");
    }

    #[test]
    fn test_page_from_dialog() {
        let event = DialogEvent {
            dialog_id: DialogId::new(9),
            title: "{FFFF00}Online Groups".into(),
            info: "{FFFFFF}1  Alpha\n\n2  Beta\n".into(),
            buttons: vec!["Next".into(), "Close".into()],
        };
        let page = page_from_dialog(&event);
        assert_eq!(page.title, "Online Groups");
        assert_eq!(page.lines, vec!["1  Alpha".to_string(), "2  Beta".to_string()]);
        assert!(page.has_next);
    }

    #[test]
    fn test_last_page_has_no_next() {
        let event = DialogEvent {
            dialog_id: DialogId::new(9),
            title: "Roster".into(),
            info: "row".into(),
            buttons: vec!["Close".into()],
        };
        assert!(!page_from_dialog(&event).has_next);
    }
}
