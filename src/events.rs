use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One content change reported by the host editor: the inserted text and
/// the length of the range it replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentChange {
    pub text: String,
    #[serde(default)]
    pub range_length: usize,
}

impl ContentChange {
    pub fn insert(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            range_length: 0,
        }
    }

    pub fn delete(range_length: usize) -> Self {
        Self {
            text: String::new(),
            range_length,
        }
    }
}

/// Normalized identifier for a pressed key, as counted by the heatmap.
///
/// Serializes to the surface/storage string form: a bare character for
/// `Char`, otherwise `"backspace"`, `"enter"`, `"tab"` or `"space"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalKey {
    Char(char),
    Backspace,
    Enter,
    Tab,
    Space,
}

impl LogicalKey {
    /// Derive the logical key for a single content change.
    ///
    /// Specific forms match before the generic single-character rule so
    /// that tab, space and newline inserts get their named ids. Longer
    /// inserts (paste, completion, formatting) have no key identity and
    /// return `None`.
    pub fn from_change(change: &ContentChange) -> Option<LogicalKey> {
        let text = change.text.as_str();
        if text.is_empty() {
            return Some(LogicalKey::Backspace);
        }
        if text.contains('\n') {
            return Some(LogicalKey::Enter);
        }
        match text {
            "\t" => return Some(LogicalKey::Tab),
            " " => return Some(LogicalKey::Space),
            _ => {}
        }
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(LogicalKey::Char(fold(c))),
            _ => None,
        }
    }
}

fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

impl fmt::Display for LogicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalKey::Char(c) => write!(f, "{c}"),
            LogicalKey::Backspace => f.write_str("backspace"),
            LogicalKey::Enter => f.write_str("enter"),
            LogicalKey::Tab => f.write_str("tab"),
            LogicalKey::Space => f.write_str("space"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognized key id {0:?}")]
pub struct ParseKeyError(pub String);

impl FromStr for LogicalKey {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "backspace" => return Ok(LogicalKey::Backspace),
            "enter" => return Ok(LogicalKey::Enter),
            "tab" => return Ok(LogicalKey::Tab),
            "space" => return Ok(LogicalKey::Space),
            _ => {}
        }
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(LogicalKey::Char(fold(c))),
            _ => Err(ParseKeyError(s.to_string())),
        }
    }
}

impl Serialize for LogicalKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LogicalKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Logical keys touched by an ordered batch of changes, in batch order.
pub fn extract_keys(changes: &[ContentChange]) -> Vec<LogicalKey> {
    changes.iter().filter_map(LogicalKey::from_change).collect()
}

/// Total inserted characters across a batch, for the speed window. Counts
/// every insert, including ones with no key identity.
pub fn inserted_chars(changes: &[ContentChange]) -> u64 {
    changes.iter().map(|c| c.text.chars().count() as u64).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_char_is_case_folded() {
        assert_eq!(
            LogicalKey::from_change(&ContentChange::insert("A")),
            Some(LogicalKey::Char('a'))
        );
        assert_eq!(
            LogicalKey::from_change(&ContentChange::insert("z")),
            Some(LogicalKey::Char('z'))
        );
    }

    #[test]
    fn test_deletion_is_backspace() {
        assert_eq!(
            LogicalKey::from_change(&ContentChange::delete(1)),
            Some(LogicalKey::Backspace)
        );
        assert_eq!(
            LogicalKey::from_change(&ContentChange::delete(12)),
            Some(LogicalKey::Backspace)
        );
    }

    #[test]
    fn test_line_break_is_enter() {
        assert_eq!(
            LogicalKey::from_change(&ContentChange::insert("\n")),
            Some(LogicalKey::Enter)
        );
        // auto-indent after enter still counts as one enter press
        assert_eq!(
            LogicalKey::from_change(&ContentChange::insert("\n    ")),
            Some(LogicalKey::Enter)
        );
        assert_eq!(
            LogicalKey::from_change(&ContentChange::insert("\r\n")),
            Some(LogicalKey::Enter)
        );
    }

    #[test]
    fn test_tab_and_space_get_named_ids() {
        assert_eq!(
            LogicalKey::from_change(&ContentChange::insert("\t")),
            Some(LogicalKey::Tab)
        );
        assert_eq!(
            LogicalKey::from_change(&ContentChange::insert(" ")),
            Some(LogicalKey::Space)
        );
    }

    #[test]
    fn test_multi_char_insert_has_no_key() {
        assert_eq!(LogicalKey::from_change(&ContentChange::insert("hello")), None);
        assert_eq!(LogicalKey::from_change(&ContentChange::insert("  ")), None);
        assert_eq!(LogicalKey::from_change(&ContentChange::insert("\t\t")), None);
    }

    #[test]
    fn test_extract_keys_preserves_order() {
        let changes = vec![
            ContentChange::insert("H"),
            ContentChange::insert("pasted text"),
            ContentChange::delete(1),
            ContentChange::insert(" "),
        ];
        assert_eq!(
            extract_keys(&changes),
            vec![
                LogicalKey::Char('h'),
                LogicalKey::Backspace,
                LogicalKey::Space
            ]
        );
    }

    #[test]
    fn test_inserted_chars_counts_everything() {
        let changes = vec![
            ContentChange::insert("a"),
            ContentChange::insert("pasted"),
            ContentChange::delete(3),
        ];
        assert_eq!(inserted_chars(&changes), 7);
    }

    #[test]
    fn test_inserted_chars_empty_batch() {
        assert_eq!(inserted_chars(&[]), 0);
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        let keys = [
            LogicalKey::Char('q'),
            LogicalKey::Backspace,
            LogicalKey::Enter,
            LogicalKey::Tab,
            LogicalKey::Space,
        ];
        for key in keys {
            assert_eq!(key.to_string().parse::<LogicalKey>(), Ok(key));
        }
    }

    #[test]
    fn test_parse_rejects_unknown_ids() {
        assert!("shift".parse::<LogicalKey>().is_err());
        assert!("".parse::<LogicalKey>().is_err());
    }

    #[test]
    fn test_serde_uses_string_ids() {
        let json = serde_json::to_string(&LogicalKey::Backspace).unwrap();
        assert_eq!(json, "\"backspace\"");
        let json = serde_json::to_string(&LogicalKey::Char('k')).unwrap();
        assert_eq!(json, "\"k\"");

        let key: LogicalKey = serde_json::from_str("\"enter\"").unwrap();
        assert_eq!(key, LogicalKey::Enter);
    }

    #[test]
    fn test_content_change_wire_names() {
        let change: ContentChange =
            serde_json::from_str(r#"{"text":"a","rangeLength":2}"#).unwrap();
        assert_eq!(change.text, "a");
        assert_eq!(change.range_length, 2);

        // rangeLength may be omitted for plain inserts
        let change: ContentChange = serde_json::from_str(r#"{"text":"b"}"#).unwrap();
        assert_eq!(change.range_length, 0);
    }
}
