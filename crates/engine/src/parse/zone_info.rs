//! Zone-info and group-stats block grammars.

use std::sync::LazyLock;

use chrono::Duration;
use regex_lite::Regex;
use zonewarden_domain::{DialogPage, ZoneId};

/// Parsed `/gzinfo` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneInfoReport {
    /// Zone identity as reported, when the dialog carries one. Used to
    /// detect stale or crossed responses.
    pub zone_id: Option<ZoneId>,
    pub owner: Option<String>,
    /// Time until the attack window opens; absent when the zone is
    /// already attackable.
    pub attackable_in: Option<Duration>,
}

static ZONE_IDENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\s*(\d+)").expect("valid regex"));
static OWNER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"owned by group "([^"]+)""#).expect("valid regex"));
static HOURS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s+hours?").expect("valid regex"));
static MINUTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s+minutes?").expect("valid regex"));
static TAG_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)-\s*Tag:\s*(\S+)").expect("valid regex"));

/// Scrape a cleaned zone-info dialog.
pub fn parse_zone_info(page: &DialogPage) -> ZoneInfoReport {
    let zone_id = std::iter::once(page.title.as_str())
        .chain(page.lines.iter().map(String::as_str))
        .find_map(|text| {
            ZONE_IDENTITY
                .captures(text)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse().ok())
        });

    let owner = page.lines.iter().find_map(|line| {
        OWNER_LINE
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
    });

    let attackable_in = page
        .lines
        .iter()
        .find(|line| line.contains("attacked in"))
        .map(|line| {
            let hours = capture_number(&HOURS, line);
            let minutes = capture_number(&MINUTES, line);
            Duration::minutes(hours * 60 + minutes)
        });

    ZoneInfoReport {
        zone_id,
        owner,
        attackable_in,
    }
}

/// Scrape the `- Tag: XYZ` line of a group-stats dialog.
pub fn parse_group_tag(page: &DialogPage) -> Option<String> {
    page.lines.iter().find_map(|line| {
        TAG_LINE
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
    })
}

fn capture_number(re: &Regex, line: &str) -> i64 {
    re.captures(line)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}
