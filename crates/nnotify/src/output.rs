use nostr_notify::Notification;
use serde::Serialize;

/// Output formatter that supports both human-readable and JSON output
pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    /// Output a successful result
    pub fn success<T: Serialize>(&self, command: &str, data: T) {
        if self.json {
            let response = JsonResponse {
                status: "ok",
                command,
                data: Some(data),
                error: None::<String>,
            };
            println!("{}", serde_json::to_string(&response).unwrap_or_default());
        } else {
            println!("{}", serde_json::to_string_pretty(&data).unwrap_or_default());
        }
    }

    /// Output a simple success message
    pub fn success_message(&self, command: &str, message: &str) {
        if self.json {
            let response = JsonResponse {
                status: "ok",
                command,
                data: Some(serde_json::json!({ "message": message })),
                error: None::<String>,
            };
            println!("{}", serde_json::to_string(&response).unwrap_or_default());
        } else {
            println!("{}", message);
        }
    }

    /// Output an error
    pub fn error(&self, message: &str) {
        if self.json {
            let response: JsonResponse<()> = JsonResponse {
                status: "error",
                command: "",
                data: None,
                error: Some(message.to_string()),
            };
            eprintln!("{}", serde_json::to_string(&response).unwrap_or_default());
        } else {
            eprintln!("Error: {}", message);
        }
    }

    /// Output a streaming event (for listen)
    pub fn event<T: Serialize>(&self, event_type: &str, data: T) {
        if self.json {
            let event = StreamEvent {
                event: event_type,
                data,
            };
            println!("{}", serde_json::to_string(&event).unwrap_or_default());
        } else {
            println!(
                "[{}] {}",
                event_type,
                serde_json::to_string(&data).unwrap_or_default()
            );
        }
    }

    /// Output a notification, as a stream event or a readable line
    pub fn notification(&self, notification: &Notification, now_ms: u64) {
        if self.json {
            self.event("notification", notification);
        } else {
            println!("{}", render_notification(notification, now_ms));
        }
    }
}

/// One line per notification: age, priority, title, message, then topic and
/// tags when present.
pub fn render_notification(notification: &Notification, now_ms: u64) -> String {
    let mut line = format!(
        "{:>9} [{}] {}: {}",
        format_age(notification.received_at, now_ms),
        notification.level(),
        notification.title.as_deref().unwrap_or("Notification"),
        notification.message
    );
    if let Some(topic) = &notification.topic {
        line.push_str(&format!(" (topic: {})", topic));
    }
    if let Some(tags) = notification.tags.as_ref().filter(|t| !t.is_empty()) {
        line.push_str(&format!(" (tags: {})", tags.join(", ")));
    }
    line
}

pub fn format_age(received_at_ms: u64, now_ms: u64) -> String {
    let minutes = now_ms.saturating_sub(received_at_ms) / 60_000;
    match minutes {
        0 => "Just now".to_string(),
        1..=59 => format!("{}m ago", minutes),
        60..=1439 => format!("{}h ago", minutes / 60),
        _ => format!("{}d ago", minutes / 1440),
    }
}

#[derive(Serialize)]
struct JsonResponse<'a, T: Serialize> {
    status: &'a str,
    command: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct StreamEvent<'a, T: Serialize> {
    event: &'a str,
    data: T,
}

#[cfg(test)]
mod tests {
    use super::*;
    use nostr_notify::Priority;

    fn notification() -> Notification {
        Notification {
            id: "id".to_string(),
            title: Some("Deploy".to_string()),
            message: "finished".to_string(),
            priority: Some(Priority::High.into()),
            topic: Some("ci".to_string()),
            tags: Some(vec!["prod".to_string(), "eu".to_string()]),
            icon: None,
            received_at: 0,
            from: "ab".repeat(32),
        }
    }

    #[test]
    fn test_output_json_mode() {
        let output = Output::new(true);
        assert!(output.is_json());
    }

    #[test]
    fn test_output_human_mode() {
        let output = Output::new(false);
        assert!(!output.is_json());
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(0, 59_000), "Just now");
        assert_eq!(format_age(0, 5 * 60_000), "5m ago");
        assert_eq!(format_age(0, 3 * 3_600_000), "3h ago");
        assert_eq!(format_age(0, 49 * 3_600_000), "2d ago");
        // Clock skew never underflows
        assert_eq!(format_age(10_000, 0), "Just now");
    }

    #[test]
    fn test_render_notification() {
        let line = render_notification(&notification(), 120_000);
        assert_eq!(
            line,
            "   2m ago [high] Deploy: finished (topic: ci) (tags: prod, eu)"
        );
    }

    #[test]
    fn test_render_notification_defaults() {
        let mut n = notification();
        n.title = None;
        n.priority = None;
        n.topic = None;
        n.tags = Some(Vec::new());
        let line = render_notification(&n, 0);
        assert_eq!(line, " Just now [default] Notification: finished");
    }
}
