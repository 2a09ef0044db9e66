//! Chat-line grammars: zone war announcements and group roster events.

use std::sync::LazyLock;

use regex_lite::Regex;
use zonewarden_domain::{WarOutcome, ZoneId};

use crate::parse::markup::strip_colors;

/// A zone-war announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarLine {
    Started {
        attacker: String,
        defender: String,
    },
    Outcome {
        group: String,
        outcome: WarOutcome,
        zone_id: ZoneId,
    },
}

static WAR_OUTCOME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)ZONE WAR: (.+?) (takes over|keeps) zone ['"]#?\s*(\d+)['"]"#)
        .expect("valid regex")
});
static WAR_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)ZONE WAR: (.+?) vs (.+)").expect("valid regex"));

/// Parse a war announcement from a raw chat line.
///
/// Outcome lines are checked first: both grammars share the prefix and a
/// " vs " in a group name must not shadow a result line.
pub fn parse_war_line(raw: &str) -> Option<WarLine> {
    let clean = strip_colors(raw);

    if let Some(captures) = WAR_OUTCOME.captures(&clean) {
        let outcome = match captures.get(2)?.as_str().to_lowercase().as_str() {
            "takes over" => WarOutcome::TakesOver,
            _ => WarOutcome::Keeps,
        };
        return Some(WarLine::Outcome {
            group: captures.get(1)?.as_str().trim().to_string(),
            outcome,
            zone_id: captures.get(3)?.as_str().parse().ok()?,
        });
    }

    WAR_START.captures(&clean).and_then(|captures| {
        Some(WarLine::Started {
            attacker: captures.get(1)?.as_str().trim().to_string(),
            defender: captures.get(2)?.as_str().trim().to_string(),
        })
    })
}

/// A member reference as printed in group event lines: `Name(12)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRef {
    pub name: String,
    pub id: Option<u32>,
}

/// A group roster event line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupEventLine {
    Login { player: PlayerRef, rank: String },
    Logout { player: PlayerRef },
    RankChange { player: PlayerRef, from: String, to: String },
    RoleChange { player: PlayerRef, from: String, to: String },
}

static LOGIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"GROUP: ([^(]+\(\d+\)) logged in - (\S+)").expect("valid regex"));
static LOGOUT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"GROUP: ([^(]+\(\d+\)) logged out").expect("valid regex"));
static RANK_CHANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"GROUP: [^(]+\(\d+\) changed the rank of ([^(]+\(\d+\)) from '(.+)' to '(.+)'")
        .expect("valid regex")
});
static ROLE_CHANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"GROUP: [^(]+\(\d+\) changed the role of ([^(]+\(\d+\)) from '(.+)' to '(.+)'")
        .expect("valid regex")
});
static PLAYER_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^(]+)\((\d+)\)$").expect("valid regex"));

fn parse_player(raw: &str) -> PlayerRef {
    if let Some(captures) = PLAYER_REF.captures(raw.trim()) {
        let name = captures
            .get(1)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
        let id = captures.get(2).and_then(|m| m.as_str().parse().ok());
        if !name.is_empty() {
            return PlayerRef { name, id };
        }
    }
    PlayerRef {
        name: raw.trim().to_string(),
        id: None,
    }
}

/// Parse a `GROUP:` roster event from a raw chat line.
pub fn parse_group_event(raw: &str) -> Option<GroupEventLine> {
    let clean = strip_colors(raw);
    if !clean.starts_with("GROUP:") {
        return None;
    }

    // Rank/role changes before login/logout: their lines embed a second
    // player reference that the simpler grammars would half-match.
    if let Some(c) = RANK_CHANGE.captures(&clean) {
        return Some(GroupEventLine::RankChange {
            player: parse_player(c.get(1)?.as_str()),
            from: c.get(2)?.as_str().to_string(),
            to: c.get(3)?.as_str().to_string(),
        });
    }
    if let Some(c) = ROLE_CHANGE.captures(&clean) {
        return Some(GroupEventLine::RoleChange {
            player: parse_player(c.get(1)?.as_str()),
            from: c.get(2)?.as_str().to_string(),
            to: c.get(3)?.as_str().to_string(),
        });
    }
    if let Some(c) = LOGIN.captures(&clean) {
        return Some(GroupEventLine::Login {
            player: parse_player(c.get(1)?.as_str()),
            rank: c.get(2)?.as_str().to_string(),
        });
    }
    if let Some(c) = LOGOUT.captures(&clean) {
        return Some(GroupEventLine::Logout {
            player: parse_player(c.get(1)?.as_str()),
        });
    }
    None
}
