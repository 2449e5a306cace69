use serde::Serialize;
use std::sync::Arc;

use crate::types::{DEFAULT_ALERT_ICON, DEFAULT_ALERT_TITLE};
use crate::{Notification, Priority};

/// What the host alert surface is asked to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub title: String,
    pub body: String,
    pub icon: String,
    /// Replaces an earlier alert with the same tag.
    pub tag: String,
    pub require_interaction: bool,
    pub silent: bool,
}

impl Alert {
    pub fn from_notification(notification: &Notification) -> Self {
        let priority = notification.level();
        Self {
            title: notification
                .title
                .clone()
                .unwrap_or_else(|| DEFAULT_ALERT_TITLE.to_string()),
            body: notification.message.clone(),
            icon: notification
                .icon
                .clone()
                .unwrap_or_else(|| DEFAULT_ALERT_ICON.to_string()),
            tag: notification.id.clone(),
            require_interaction: priority == Priority::Urgent,
            silent: priority == Priority::Min,
        }
    }
}

/// Native alert surface of the host (desktop notifications, terminal, ...).
pub trait AlertSink: Send + Sync {
    fn permission_granted(&self) -> bool;

    fn present(&self, alert: &Alert) -> std::result::Result<(), String>;
}

/// Sink for hosts without an alert surface. Never granted.
pub struct NullAlertSink;

impl AlertSink for NullAlertSink {
    fn permission_granted(&self) -> bool {
        false
    }

    fn present(&self, _alert: &Alert) -> std::result::Result<(), String> {
        Ok(())
    }
}

#[derive(Clone)]
pub struct AlertDispatcher {
    sink: Arc<dyn AlertSink>,
}

impl AlertDispatcher {
    pub fn new(sink: Arc<dyn AlertSink>) -> Self {
        Self { sink }
    }

    /// Show an alert for `notification`. Returns whether one was presented.
    /// Missing permission and sink errors are not propagated.
    pub fn dispatch(&self, notification: &Notification) -> bool {
        if !self.sink.permission_granted() {
            return false;
        }

        let alert = Alert::from_notification(notification);
        match self.sink.present(&alert) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(id = %notification.id, error = %e, "failed to show alert");
                false
            }
        }
    }

    pub fn test_alert(&self) -> bool {
        if !self.sink.permission_granted() {
            return false;
        }

        let alert = Alert {
            title: "Test Notification".to_string(),
            body: "This is a test notification from Nostr Notify".to_string(),
            icon: DEFAULT_ALERT_ICON.to_string(),
            tag: "test".to_string(),
            require_interaction: false,
            silent: false,
        };
        match self.sink.present(&alert) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "failed to show test alert");
                false
            }
        }
    }
}

impl Default for AlertDispatcher {
    fn default() -> Self {
        Self::new(Arc::new(NullAlertSink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingSink {
        granted: bool,
        fail: bool,
        shown: Mutex<Vec<Alert>>,
    }

    impl RecordingSink {
        fn new(granted: bool, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                granted,
                fail,
                shown: Mutex::new(Vec::new()),
            })
        }
    }

    impl AlertSink for RecordingSink {
        fn permission_granted(&self) -> bool {
            self.granted
        }

        fn present(&self, alert: &Alert) -> std::result::Result<(), String> {
            self.shown.lock().unwrap().push(alert.clone());
            if self.fail {
                Err("display unavailable".to_string())
            } else {
                Ok(())
            }
        }
    }

    fn notification(priority: Option<Priority>) -> Notification {
        Notification {
            id: "id-1".to_string(),
            title: None,
            message: "hi".to_string(),
            priority: priority.map(Into::into),
            topic: None,
            tags: None,
            icon: None,
            received_at: 0,
            from: "ab".repeat(32),
        }
    }

    #[test]
    fn urgent_requires_interaction() {
        let alert = Alert::from_notification(&notification(Some(Priority::Urgent)));
        assert!(alert.require_interaction);
        assert!(!alert.silent);
        assert_eq!(alert.title, DEFAULT_ALERT_TITLE);
        assert_eq!(alert.icon, DEFAULT_ALERT_ICON);
        assert_eq!(alert.tag, "id-1");
        assert_eq!(alert.body, "hi");
    }

    #[test]
    fn min_is_silent() {
        let alert = Alert::from_notification(&notification(Some(Priority::Min)));
        assert!(alert.silent);
        assert!(!alert.require_interaction);

        let alert = Alert::from_notification(&notification(None));
        assert!(!alert.silent);
        assert!(!alert.require_interaction);
    }

    #[test]
    fn dispatch_without_permission_is_a_no_op() {
        let sink = RecordingSink::new(false, false);
        let dispatcher = AlertDispatcher::new(sink.clone());
        assert!(!dispatcher.dispatch(&notification(None)));
        assert!(!dispatcher.test_alert());
        assert!(sink.shown.lock().unwrap().is_empty());
    }

    #[test]
    fn dispatch_swallows_sink_errors() {
        let sink = RecordingSink::new(true, true);
        let dispatcher = AlertDispatcher::new(sink.clone());
        assert!(!dispatcher.dispatch(&notification(None)));
        assert_eq!(sink.shown.lock().unwrap().len(), 1);
    }

    #[test]
    fn dispatch_presents_alert() {
        let sink = RecordingSink::new(true, false);
        let dispatcher = AlertDispatcher::new(sink.clone());
        assert!(dispatcher.dispatch(&notification(Some(Priority::High))));
        assert!(dispatcher.test_alert());
        let shown = sink.shown.lock().unwrap();
        assert_eq!(shown.len(), 2);
        assert_eq!(shown[1].title, "Test Notification");
    }
}
