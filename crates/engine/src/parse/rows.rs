//! Row grammars for list-style dialogs.
//!
//! Each paginated dialog kind has a positional line grammar; the
//! pagination walker is generic over these so control flow never touches
//! the scraping details.

use std::sync::LazyLock;

use regex_lite::Regex;

/// A parseable row kind. The walker's only axis of variation.
pub trait RowGrammar {
    type Row;

    /// Parse one cleaned dialog line; `None` for headers and separators.
    fn parse(&self, line: &str) -> Option<Self::Row>;

    /// The name column used for target matching.
    fn name<'r>(&self, row: &'r Self::Row) -> &'r str;
}

// =============================================================================
// Roster rows
// =============================================================================

/// Member row of a group roster: leading numeric index, name tokens, then
/// trailing role and last-active columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterRow {
    pub name: String,
    pub role: String,
    pub last_active: String,
}

pub struct RosterGrammar;

static COLUMN_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\t|\s{2,}").expect("valid regex"));
static DATE_COLUMN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,2}\s\w+$").expect("valid regex"));

const ROLE_NAMES: [&str; 3] = ["Leader", "Co-Leader", "Member"];

impl RowGrammar for RosterGrammar {
    type Row = RosterRow;

    fn parse(&self, line: &str) -> Option<RosterRow> {
        let columns: Vec<&str> = COLUMN_SPLIT
            .split(line)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect();
        if columns.len() < 5 {
            return None;
        }

        // Name tokens run from after the index up to the first role or
        // date column.
        let mut name_parts = Vec::new();
        let mut i = 1;
        while i < columns.len() - 3
            && !ROLE_NAMES.contains(&columns[i])
            && !DATE_COLUMN.is_match(columns[i])
        {
            name_parts.push(columns[i]);
            i += 1;
        }
        if name_parts.is_empty() {
            return None;
        }

        Some(RosterRow {
            name: name_parts.join(" "),
            role: columns[columns.len() - 2].to_string(),
            last_active: columns[columns.len() - 1].to_string(),
        })
    }

    fn name<'r>(&self, row: &'r RosterRow) -> &'r str {
        &row.name
    }
}

// =============================================================================
// Indexed name rows (group lists, rank lists, role lists)
// =============================================================================

/// Simple list row: a leading numeric index followed by a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedNameRow {
    pub index: u32,
    pub name: String,
}

pub struct IndexedNameGrammar;

static INDEXED_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+(.+)$").expect("valid regex"));

impl RowGrammar for IndexedNameGrammar {
    type Row = IndexedNameRow;

    fn parse(&self, line: &str) -> Option<IndexedNameRow> {
        let captures = INDEXED_ROW.captures(line)?;
        let index = captures.get(1)?.as_str().parse().ok()?;
        Some(IndexedNameRow {
            index,
            name: captures.get(2)?.as_str().trim().to_string(),
        })
    }

    fn name<'r>(&self, row: &'r IndexedNameRow) -> &'r str {
        &row.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_row_single_token_name() {
        let row = RosterGrammar
            .parse("3  Kowalski  1200  Member  12 March")
            .expect("row");
        assert_eq!(row.name, "Kowalski");
        assert_eq!(row.role, "Member");
        assert_eq!(row.last_active, "12 March");
    }

    #[test]
    fn test_roster_row_multi_token_name() {
        let row = RosterGrammar
            .parse("1\tDon  Corleone\t900\tLeader\t2 May")
            .expect("row");
        assert_eq!(row.name, "Don Corleone");
        assert_eq!(row.role, "Leader");
    }

    #[test]
    fn test_roster_rejects_headers() {
        assert!(RosterGrammar.parse("Members of Alpha").is_none());
        assert!(RosterGrammar.parse("").is_none());
    }

    #[test]
    fn test_indexed_row() {
        let row = IndexedNameGrammar.parse("12  Black Hand").expect("row");
        assert_eq!(row.index, 12);
        assert_eq!(row.name, "Black Hand");
        assert!(IndexedNameGrammar.parse("totals: 4 groups").is_none());
    }
}
