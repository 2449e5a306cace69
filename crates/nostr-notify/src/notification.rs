use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::types::now_millis;
use crate::{InboundEvent, NormalizeFailure, Priority};

/// Priority exactly as the sender wrote it. Serializes back verbatim;
/// [`WirePriority::level`] gives the effective level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WirePriority(Value);

impl WirePriority {
    pub fn level(&self) -> Priority {
        Priority::from_wire(&self.0)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<Priority> for WirePriority {
    fn from(priority: Priority) -> Self {
        Self(Value::String(priority.as_str().to_string()))
    }
}

/// Tags as a list of strings. Numbers and booleans in the list are kept as
/// text, other elements are dropped, and a single comma separated string is
/// split.
fn lenient_tags<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let tags = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) => Some(items.into_iter().filter_map(tag_text).collect()),
        Some(Value::String(text)) => Some(
            text.split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        Some(other) => Some(tag_text(other).into_iter().collect()),
    };
    Ok(tags)
}

fn tag_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Decrypted wire payload: `{title?, message, priority?, topic?, tags?, icon?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<WirePriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_tags",
        skip_serializing_if = "Option::is_none"
    )]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// A received notification: the payload plus where and when it came from.
/// Only built by [`normalize`], so `message` is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<WirePriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Milliseconds since the unix epoch.
    pub received_at: u64,
    /// Sender public key, hex.
    pub from: String,
}

impl Notification {
    /// Priority with the `default` level filled in when the sender gave none.
    pub fn level(&self) -> Priority {
        self.priority
            .as_ref()
            .map(WirePriority::level)
            .unwrap_or_default()
    }

    pub fn payload(&self) -> NotificationPayload {
        NotificationPayload {
            title: self.title.clone(),
            message: self.message.clone(),
            priority: self.priority.clone(),
            topic: self.topic.clone(),
            tags: self.tags.clone(),
            icon: self.icon.clone(),
        }
    }

    pub fn to_payload_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.payload())
    }
}

pub fn normalize(
    plaintext: &str,
    event: &InboundEvent,
) -> std::result::Result<Notification, NormalizeFailure> {
    normalize_at(plaintext, event, now_millis())
}

pub fn normalize_at(
    plaintext: &str,
    event: &InboundEvent,
    received_at: u64,
) -> std::result::Result<Notification, NormalizeFailure> {
    let payload: NotificationPayload = serde_json::from_str(plaintext)
        .map_err(|e| NormalizeFailure::MalformedPayload(e.to_string()))?;

    Ok(Notification {
        id: event.id.to_hex(),
        title: payload.title,
        message: payload.message,
        priority: payload.priority,
        topic: payload.topic,
        tags: payload.tags,
        icon: payload.icon,
        received_at,
        from: event.pubkey.to_hex(),
    })
}
