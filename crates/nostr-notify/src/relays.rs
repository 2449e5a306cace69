use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A relay URI restricted to the `ws://` and `wss://` schemes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelayEndpoint(String);

impl RelayEndpoint {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.starts_with("wss://") || raw.starts_with("ws://") {
            Some(Self(raw.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelayEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RelayEndpoint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Parse newline separated relay text. Lines that are not websocket URIs are
/// dropped; order and duplicates are kept.
pub fn parse(raw_text: &str) -> Vec<RelayEndpoint> {
    raw_text.lines().filter_map(RelayEndpoint::parse).collect()
}

/// Drop repeated endpoints, keeping the first occurrence.
pub fn dedup(relays: &[RelayEndpoint]) -> Vec<RelayEndpoint> {
    let mut seen = HashSet::new();
    relays
        .iter()
        .filter(|relay| seen.insert(relay.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(relays: &[RelayEndpoint]) -> Vec<&str> {
        relays.iter().map(|r| r.as_str()).collect()
    }

    #[test]
    fn parse_keeps_websocket_lines_in_order() {
        let relays = parse("wss://a\nfoo\nws://b\n  \n");
        assert_eq!(strs(&relays), vec!["wss://a", "ws://b"]);
    }

    #[test]
    fn parse_trims_and_keeps_duplicates() {
        let relays = parse("  wss://relay.damus.io  \r\nhttps://x\nwss://relay.damus.io");
        assert_eq!(
            strs(&relays),
            vec!["wss://relay.damus.io", "wss://relay.damus.io"]
        );
    }

    #[test]
    fn parse_empty_input() {
        assert!(parse("").is_empty());
        assert!(parse("   \n\t\n").is_empty());
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let relays = parse("wss://b\nwss://a\nwss://b\nws://c");
        assert_eq!(strs(&dedup(&relays)), vec!["wss://b", "wss://a", "ws://c"]);
    }
}
