use nostr_notify::{Alert, AlertSink};
use std::io::Write;

/// Shows alerts on stderr, ringing the terminal bell unless the alert is
/// silent. Permission is the `alerts` config switch.
pub struct TerminalAlertSink {
    enabled: bool,
}

impl TerminalAlertSink {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl AlertSink for TerminalAlertSink {
    fn permission_granted(&self) -> bool {
        self.enabled
    }

    fn present(&self, alert: &Alert) -> Result<(), String> {
        let mut stderr = std::io::stderr().lock();
        write!(stderr, "{}", render_alert(alert)).map_err(|e| e.to_string())?;
        stderr.flush().map_err(|e| e.to_string())
    }
}

fn render_alert(alert: &Alert) -> String {
    let bell = if alert.silent { "" } else { "\x07" };
    let marker = if alert.require_interaction { "!!" } else { "**" };
    format!("{}{} {} {}: {}\n", bell, marker, alert.title, marker, alert.body)
}
