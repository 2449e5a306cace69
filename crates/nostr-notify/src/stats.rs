use serde::Serialize;
use std::time::{Duration, Instant};

use crate::Status;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub status: Status,
    pub connected_relays: usize,
    pub total_notifications: usize,
    #[serde(serialize_with = "serialize_secs")]
    pub uptime: Duration,
}

/// Controller state that stats are derived from.
#[derive(Debug, Clone, Copy)]
pub struct SessionView {
    pub status: Status,
    pub connected_relays: usize,
    pub started_at: Option<Instant>,
}

pub struct StatsAggregator;

impl StatsAggregator {
    pub fn project(session: &SessionView, history_len: usize, now: Instant) -> Stats {
        let uptime = match (session.status, session.started_at) {
            (Status::Disconnected, _) | (_, None) => Duration::ZERO,
            (_, Some(started_at)) => now.saturating_duration_since(started_at),
        };
        let connected_relays = if session.status == Status::Disconnected {
            0
        } else {
            session.connected_relays
        };

        Stats {
            status: session.status,
            connected_relays,
            total_notifications: history_len,
            uptime,
        }
    }
}

/// `HH:MM:SS`, hours not wrapped.
pub fn format_uptime(uptime: Duration) -> String {
    let seconds = uptime.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds / 60) % 60,
        seconds % 60
    )
}

fn serialize_secs<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(duration.as_secs())
}
