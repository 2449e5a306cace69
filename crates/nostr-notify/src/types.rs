use nostr::{EventId, PublicKey, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Application-specific data kind carrying encrypted notifications.
pub const NOTIFICATION_EVENT_KIND: u16 = 30078;

/// Maximum number of notifications kept in history.
pub const HISTORY_CAPACITY: usize = 100;

pub const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const UPTIME_TICK_INTERVAL: Duration = Duration::from_secs(1);

pub const KEY_STORAGE_KEY: &str = "nostr-notify-key";
pub const RELAYS_STORAGE_KEY: &str = "nostr-notify-relays";
pub const HISTORY_STORAGE_KEY: &str = "nostr-notify-history";

pub const DEFAULT_ALERT_TITLE: &str = "Nostr Notification";
pub const DEFAULT_ALERT_ICON: &str = "icon-192.png";

/// An encrypted event delivered by a relay, reduced to the fields the
/// pipeline needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub id: EventId,
    pub pubkey: PublicKey,
    pub content: String,
    pub created_at: Timestamp,
}

impl From<&nostr::Event> for InboundEvent {
    fn from(event: &nostr::Event) -> Self {
        Self {
            id: event.id,
            pubkey: event.pubkey,
            content: event.content.clone(),
            created_at: event.created_at,
        }
    }
}

/// Notification urgency, on the ntfy-style five step scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Min,
    Low,
    #[default]
    Default,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Min => "min",
            Priority::Low => "low",
            Priority::Default => "default",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl Priority {
    /// Level for a priority as senders write it: the five names in any case,
    /// `max` for urgent, or the numeric scale 1 to 5 as a number or string.
    /// Anything else counts as `Default`.
    pub fn from_wire(value: &Value) -> Self {
        match value {
            Value::String(s) => {
                let s = s.trim().to_ascii_lowercase();
                if s == "max" {
                    return Priority::Urgent;
                }
                if let Ok(level) = s.parse::<Priority>() {
                    return level;
                }
                s.parse::<u64>().map(Self::from_number).unwrap_or_default()
            }
            Value::Number(n) => n.as_u64().map(Self::from_number).unwrap_or_default(),
            _ => Priority::Default,
        }
    }

    fn from_number(n: u64) -> Self {
        match n {
            1 => Priority::Min,
            2 => Priority::Low,
            4 => Priority::High,
            5 => Priority::Urgent,
            _ => Priority::Default,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "min" => Ok(Priority::Min),
            "low" => Ok(Priority::Low),
            "default" => Ok(Priority::Default),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            other => Err(format!("unknown priority '{}'", other)),
        }
    }
}

/// Lifecycle state of the subscription session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Disconnected => "disconnected",
            Status::Connecting => "connecting",
            Status::Connected => "connected",
        };
        f.write_str(s)
    }
}

/// Wall clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn priority_parses_known_levels() {
        assert_eq!("urgent".parse::<Priority>().unwrap(), Priority::Urgent);
        assert_eq!("min".parse::<Priority>().unwrap(), Priority::Min);
        assert!("URGENT".parse::<Priority>().is_err());
    }

    #[test]
    fn wire_priority_aliases_map_to_levels() {
        let cases = [
            (json!("max"), Priority::Urgent),
            (json!("URGENT"), Priority::Urgent),
            (json!(" High "), Priority::High),
            (json!(5), Priority::Urgent),
            (json!(1), Priority::Min),
            (json!("2"), Priority::Low),
            (json!(3), Priority::Default),
        ];
        for (value, expected) in cases {
            assert_eq!(Priority::from_wire(&value), expected, "{}", value);
        }
    }

    #[test]
    fn unknown_wire_priority_is_default() {
        for value in [json!("sometime"), json!(0), json!(9), json!(4.5), json!(true), json!({})] {
            assert_eq!(Priority::from_wire(&value), Priority::Default, "{}", value);
        }
    }

    #[test]
    fn priority_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"high\"");
        let p: Priority = serde_json::from_str("\"low\"").unwrap();
        assert_eq!(p, Priority::Low);
    }
}
